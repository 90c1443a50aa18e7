use thermo_align_core::{GrayImage, GrayImageView};

fn identity_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = i as u8;
    }
    lut
}

fn tile_lut(src: &GrayImageView<'_>, x0: usize, x1: usize, y0: usize, y1: usize, clip_limit: f32) -> [u8; 256] {
    let total = (x1 - x0) * (y1 - y0);
    if total == 0 {
        return identity_lut();
    }

    let mut hist = [0u32; 256];
    for y in y0..y1 {
        let row = y * src.width;
        for x in x0..x1 {
            hist[src.data[row + x] as usize] += 1;
        }
    }

    // clip the histogram and hand the excess back uniformly
    let clip = ((clip_limit * total as f32 / 256.0).max(1.0)) as u32;
    let mut excess = 0u32;
    for h in hist.iter_mut() {
        if *h > clip {
            excess += *h - clip;
            *h = clip;
        }
    }
    let bonus = excess / 256;
    let mut leftover = (excess % 256) as usize;
    for h in hist.iter_mut() {
        *h += bonus;
        if leftover > 0 {
            *h += 1;
            leftover -= 1;
        }
    }

    let mut lut = [0u8; 256];
    let scale = 255.0 / total as f32;
    let mut cdf = 0u32;
    for i in 0..256 {
        cdf += hist[i];
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Contrast-limited adaptive histogram equalization over a `grid x grid`
/// tile layout, with bilinear blending between neighbouring tile mappings so
/// tile seams never show up as false edges.
pub fn clahe(src: &GrayImageView<'_>, clip_limit: f32, grid: usize) -> GrayImage {
    let grid = grid.max(1);
    let tw = src.width.div_ceil(grid).max(1);
    let th = src.height.div_ceil(grid).max(1);

    let mut luts = Vec::with_capacity(grid * grid);
    for ty in 0..grid {
        for tx in 0..grid {
            let x0 = (tx * tw).min(src.width);
            let x1 = ((tx + 1) * tw).min(src.width);
            let y0 = (ty * th).min(src.height);
            let y1 = ((ty + 1) * th).min(src.height);
            luts.push(tile_lut(src, x0, x1, y0, y1, clip_limit));
        }
    }

    let top = grid as i32 - 1;
    let mut out = GrayImage::new(src.width, src.height);
    for y in 0..src.height {
        let fy = (y as f32 + 0.5) / th as f32 - 0.5;
        let ty0 = (fy.floor() as i32).clamp(0, top);
        let ty1 = (ty0 + 1).clamp(0, top);
        let wy = (fy - fy.floor()).clamp(0.0, 1.0);

        for x in 0..src.width {
            let fx = (x as f32 + 0.5) / tw as f32 - 0.5;
            let tx0 = (fx.floor() as i32).clamp(0, top);
            let tx1 = (tx0 + 1).clamp(0, top);
            let wx = (fx - fx.floor()).clamp(0.0, 1.0);

            let v = src.data[y * src.width + x] as usize;
            let p00 = luts[(ty0 * grid as i32 + tx0) as usize][v] as f32;
            let p10 = luts[(ty0 * grid as i32 + tx1) as usize][v] as f32;
            let p01 = luts[(ty1 * grid as i32 + tx0) as usize][v] as f32;
            let p11 = luts[(ty1 * grid as i32 + tx1) as usize][v] as f32;

            let a = p00 + wx * (p10 - p00);
            let b = p01 + wx * (p11 - p01);
            out.set(x, y, (a + wy * (b - a)).round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

/// Stretch intensities to span the full 0..=255 range. Constant images pass
/// through untouched.
pub fn normalize_minmax(src: &GrayImageView<'_>) -> GrayImage {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for &v in src.data {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi <= lo {
        return GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        };
    }

    let scale = 255.0 / (hi - lo) as f32;
    let data = src
        .data
        .iter()
        .map(|&v| ((v - lo) as f32 * scale).round() as u8)
        .collect();
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermo_align_core::GrayImage;

    #[test]
    fn clahe_widens_a_narrow_intensity_band() {
        // faint vertical ramp squeezed into 100..=115
        let img = GrayImage::from_fn(64, 64, |x, _| 100 + (x % 16) as u8);
        let out = clahe(&img.as_view(), 4.0, 8);

        let spread = |d: &[u8]| {
            let lo = *d.iter().min().unwrap() as i32;
            let hi = *d.iter().max().unwrap() as i32;
            hi - lo
        };
        assert!(
            spread(&out.data) > 2 * spread(&img.data),
            "equalization should widen the band"
        );
    }

    #[test]
    fn clahe_keeps_uniform_images_uniform() {
        let img = GrayImage {
            width: 32,
            height: 32,
            data: vec![90; 1024],
        };
        let out = clahe(&img.as_view(), 2.0, 8);
        let first = out.data[0];
        assert!(out.data.iter().all(|&v| v == first));
    }

    #[test]
    fn normalize_spans_full_range() {
        let img = GrayImage {
            width: 4,
            height: 1,
            data: vec![40, 60, 80, 100],
        };
        let out = normalize_minmax(&img.as_view());
        assert_eq!(out.data[0], 0);
        assert_eq!(out.data[3], 255);
    }

    #[test]
    fn normalize_leaves_constant_images_alone() {
        let img = GrayImage {
            width: 3,
            height: 1,
            data: vec![7, 7, 7],
        };
        let out = normalize_minmax(&img.as_view());
        assert_eq!(out.data, vec![7, 7, 7]);
    }
}
