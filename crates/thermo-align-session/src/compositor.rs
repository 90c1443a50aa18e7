//! Review composites: blends and side-by-side layouts.

use thermo_align_core::{GrayImage, GrayImageView, RgbImage};
use thermo_align_edges::{quick_edges, EdgeParams};

/// Optical frames come out dim next to thermal palettes; the compositor
/// brightens them before blending.
const OPTICAL_GAIN: f32 = 1.2;

#[inline]
fn lerp_u8(a: u8, b: u8, alpha: f32) -> u8 {
    (a as f32 * (1.0 - alpha) + b as f32 * alpha)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[inline]
fn boost(v: u8) -> u8 {
    (v as f32 * OPTICAL_GAIN).round().min(255.0) as u8
}

/// Replicate a grayscale frame into the three channels.
pub fn gray_to_rgb(src: &GrayImageView<'_>) -> RgbImage {
    let mut out = RgbImage::new(src.width, src.height);
    for y in 0..src.height {
        for x in 0..src.width {
            let v = src.data[y * src.width + x];
            out.set(x, y, [v, v, v]);
        }
    }
    out
}

// BT.601 luma, the usual color-to-gray reduction.
fn luminance(src: &RgbImage) -> GrayImage {
    GrayImage::from_fn(src.width, src.height, |x, y| {
        let [r, g, b] = src.get(x, y);
        (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
    })
}

/// Weighted per-pixel average; `alpha` is the overlay weight.
///
/// Mismatched inputs blend over the shared top-left region, which keeps the
/// unwarped-fallback composite total.
pub fn blend(base: &RgbImage, overlay: &RgbImage, alpha: f32) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let w = base.width.min(overlay.width);
    let h = base.height.min(overlay.height);
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let a = base.get(x, y);
            let b = overlay.get(x, y);
            out.set(
                x,
                y,
                [
                    lerp_u8(a[0], b[0], alpha),
                    lerp_u8(a[1], b[1], alpha),
                    lerp_u8(a[2], b[2], alpha),
                ],
            );
        }
    }
    out
}

/// Blend with the optical structure kept visible.
///
/// Edges of the optical frame are alpha-composited in white onto a
/// brightened copy before the final blend, so walls and fixtures stay
/// legible under the thermal palette.
pub fn blend_edge_emphasis(
    thermal: &RgbImage,
    optical: &RgbImage,
    alpha: f32,
    edge_params: &EdgeParams,
) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let gray = luminance(optical);
    let edges = quick_edges(&gray.as_view(), edge_params);

    let mut emphasized = RgbImage::new(optical.width, optical.height);
    for y in 0..optical.height {
        for x in 0..optical.width {
            let [r, g, b] = optical.get(x, y);
            let mut px = [boost(r), boost(g), boost(b)];
            if edges.get(x, y) != 0 {
                px = [
                    lerp_u8(px[0], 255, alpha),
                    lerp_u8(px[1], 255, alpha),
                    lerp_u8(px[2], 255, alpha),
                ];
            }
            emphasized.set(x, y, px);
        }
    }
    blend(thermal, &emphasized, alpha)
}

/// Side-by-side audit composite; the shorter image is padded with black.
pub fn hconcat(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(a.width + b.width, a.height.max(b.height));
    for y in 0..a.height {
        for x in 0..a.width {
            out.set(x, y, a.get(x, y));
        }
    }
    for y in 0..b.height {
        for x in 0..b.width {
            out.set(a.width + x, y, b.get(x, y));
        }
    }
    out
}
