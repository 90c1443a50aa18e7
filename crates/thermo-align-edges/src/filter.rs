use thermo_align_core::{GrayImage, GrayImageView};

#[inline]
fn clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[y * src.width + x]
}

/// Separable 5x5 Gaussian. Images too small for the kernel pass through
/// unchanged.
pub fn gaussian_blur(src: &GrayImageView<'_>, sigma: f32) -> GrayImage {
    const RADIUS: i32 = 2;
    if src.width < 5 || src.height < 5 {
        return GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        };
    }

    let sigma = sigma.max(0.1);
    let mut kernel = [0.0_f32; 5];
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f32 - RADIUS as f32;
        *k = (-d * d / (2.0 * sigma * sigma)).exp();
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }

    // horizontal pass
    let mut tmp = vec![0.0_f32; src.width * src.height];
    for y in 0..src.height as i32 {
        for x in 0..src.width as i32 {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                acc += k * clamped(src, x + i as i32 - RADIUS, y) as f32;
            }
            tmp[y as usize * src.width + x as usize] = acc;
        }
    }

    // vertical pass
    let mut out = GrayImage::new(src.width, src.height);
    let h = src.height as i32;
    for y in 0..h {
        for x in 0..src.width {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let yy = (y + i as i32 - RADIUS).clamp(0, h - 1) as usize;
                acc += k * tmp[yy * src.width + x];
            }
            out.set(x, y as usize, acc.round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

/// Edge-preserving bilateral denoise: spatial Gaussian weights attenuated by
/// intensity distance, so smooth regions blur while edges stay put.
///
/// Returns an untouched copy when either dimension is smaller than the
/// kernel diameter.
pub fn bilateral_filter(
    src: &GrayImageView<'_>,
    diameter: usize,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    if src.width < diameter || src.height < diameter {
        log::debug!(
            "bilateral skipped: {}x{} smaller than kernel d={}",
            src.width,
            src.height,
            diameter
        );
        return GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        };
    }

    let radius = (diameter / 2) as i32;
    let inv_space = -0.5 / (sigma_space * sigma_space).max(1e-6);
    let inv_color = -0.5 / (sigma_color * sigma_color).max(1e-6);

    // spatial weights are fixed per offset; precompute the window
    let side = (2 * radius + 1) as usize;
    let mut spatial = vec![0.0_f32; side * side];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let idx = (dy + radius) as usize * side + (dx + radius) as usize;
            spatial[idx] = ((dx * dx + dy * dy) as f32 * inv_space).exp();
        }
    }

    let mut out = GrayImage::new(src.width, src.height);
    for y in 0..src.height as i32 {
        for x in 0..src.width as i32 {
            let center = clamped(src, x, y) as f32;
            let mut acc = 0.0_f32;
            let mut norm = 0.0_f32;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let v = clamped(src, x + dx, y + dy) as f32;
                    let di = v - center;
                    let idx = (dy + radius) as usize * side + (dx + radius) as usize;
                    let w = spatial[idx] * (di * di * inv_color).exp();
                    acc += w * v;
                    norm += w;
                }
            }
            out.set(
                x as usize,
                y as usize,
                (acc / norm).round().clamp(0.0, 255.0) as u8,
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermo_align_core::GrayImage;

    fn step_image(w: usize, h: usize) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| if x < w / 2 { 20 } else { 220 })
    }

    #[test]
    fn gaussian_preserves_constant_images() {
        let img = GrayImage {
            width: 9,
            height: 9,
            data: vec![128; 81],
        };
        let blurred = gaussian_blur(&img.as_view(), 1.1);
        assert!(blurred.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn bilateral_smooths_less_across_edges_than_gaussian() {
        let img = step_image(20, 9);
        let bi = bilateral_filter(&img.as_view(), 7, 30.0, 50.0);
        let ga = gaussian_blur(&img.as_view(), 2.0);

        // sample right next to the step: bilateral must stay closer to the
        // original side value than the plain Gaussian does
        let y = 4;
        let left = img.get(8, y) as i32;
        let bi_err = (bi.get(8, y) as i32 - left).abs();
        let ga_err = (ga.get(8, y) as i32 - left).abs();
        assert!(
            bi_err < ga_err,
            "bilateral err {bi_err} should be below gaussian err {ga_err}"
        );
    }

    #[test]
    fn bilateral_skips_tiny_images() {
        let img = GrayImage {
            width: 4,
            height: 4,
            data: (0..16).map(|v| v as u8 * 10).collect(),
        };
        let out = bilateral_filter(&img.as_view(), 7, 50.0, 50.0);
        assert_eq!(out.data, img.data);
    }

    #[test]
    fn gaussian_passes_through_images_smaller_than_kernel() {
        let img = GrayImage {
            width: 3,
            height: 3,
            data: vec![1, 2, 3, 4, 5, 6, 7, 8, 9],
        };
        let out = gaussian_blur(&img.as_view(), 1.1);
        assert_eq!(out.data, img.data);
    }
}
