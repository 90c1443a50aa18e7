use nalgebra::Point2;

use crate::{sample_bilinear_rgb, sample_bilinear_u8, GrayImage, GrayImageView, RgbImage, Transform};

/// Warp `src` into an `out_w x out_h` frame. `out_to_src` maps *output*
/// pixels back into `src`, so callers hand in the inverse of the forward
/// transform. Out-of-bounds samples read as black.
pub fn warp_gray(
    src: &GrayImageView<'_>,
    out_to_src: &Transform,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            // map the output pixel center, then shift into the sampler's
            // integer-center coordinates
            let pd = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let ps = out_to_src.apply(pd);
            out.set(x, y, sample_bilinear_u8(src, ps.x - 0.5, ps.y - 0.5));
        }
    }

    out
}

/// RGB counterpart of [`warp_gray`], used for the visual composites.
pub fn warp_rgb(src: &RgbImage, out_to_src: &Transform, out_w: usize, out_h: usize) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            let pd = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let ps = out_to_src.apply(pd);
            out.set(x, y, sample_bilinear_rgb(src, ps.x - 0.5, ps.y - 0.5));
        }
    }

    out
}
