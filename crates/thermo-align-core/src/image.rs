#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn as_view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }
}

/// Interleaved RGB buffer, 3 bytes per pixel. Only the compositing stage
/// touches color; all detection runs on gray buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h*3
}

impl RgbImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, px: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&px);
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
fn get_rgb(src: &RgbImage, x: i32, y: i32) -> [u8; 3] {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return [0, 0, 0];
    }
    src.get(x as usize, y as usize)
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

#[inline]
pub fn sample_bilinear_rgb(src: &RgbImage, x: f32, y: f32) -> [u8; 3] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] as f32 + fx * (p10[c] as f32 - p00[c] as f32);
        let b = p01[c] as f32 + fx * (p11[c] as f32 - p01[c] as f32);
        out[c] = (a + fy * (b - a)).clamp(0.0, 255.0) as u8;
    }
    out
}

/// Resize to exact dimensions with bilinear sampling at destination pixel
/// centers. Matches the linear-interpolation resize the reference captures
/// were processed with.
pub fn resize_exact(src: &GrayImageView<'_>, out_w: usize, out_h: usize) -> GrayImage {
    let sx = src.width as f32 / out_w as f32;
    let sy = src.height as f32 / out_h as f32;
    let mut out = GrayImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let px = (x as f32 + 0.5) * sx - 0.5;
            let py = (y as f32 + 0.5) * sy - 0.5;
            out.set(x, y, sample_bilinear_u8(src, px, py));
        }
    }
    out
}

/// Aspect-preserving resize to the requested width. The height is rounded
/// from the source aspect ratio and never drops below one pixel.
pub fn resize_to_width(src: &GrayImageView<'_>, out_w: usize) -> GrayImage {
    let ratio = out_w as f32 / src.width as f32;
    let out_h = ((src.height as f32 * ratio).round() as usize).max(1);
    resize_exact(src, out_w, out_h)
}

/// Copy the `w x h` window at `(x, y)` into a fresh buffer. The window is
/// clamped to the source bounds.
pub fn crop_gray(src: &GrayImageView<'_>, x: usize, y: usize, w: usize, h: usize) -> GrayImage {
    let x1 = (x + w).min(src.width);
    let y1 = (y + h).min(src.height);
    let x0 = x.min(x1);
    let y0 = y.min(y1);
    let mut out = GrayImage::new(x1 - x0, y1 - y0);
    for row in y0..y1 {
        let src_off = row * src.width;
        let dst_off = (row - y0) * out.width;
        out.data[dst_off..dst_off + out.width]
            .copy_from_slice(&src.data[src_off + x0..src_off + x1]);
    }
    out
}
