//! Edge-map preprocessing for thermal/optical registration.
//!
//! Both the thermal template and the optical target are reduced to binary
//! edge maps before any matching, because the two modalities share structure
//! but not intensity statistics. The full chain (denoise, CLAHE, smoothing,
//! gradient edges) runs once per input; the multi-scale search re-runs only
//! the cheap tail on each resized target via [`quick_edges`].

mod clahe;
mod filter;
mod gradient;
mod params;

pub use clahe::{clahe, normalize_minmax};
pub use filter::{bilateral_filter, gaussian_blur};
pub use gradient::{edge_map, sobel_magnitude};
pub use params::EdgeParams;

use thermo_align_core::{GrayImage, GrayImageView};

/// Intensity conditioning half of the chain: optional bilateral denoise,
/// contrast-limited equalization, full-range stretch. The output is still a
/// grayscale frame; the scale search resizes *this* and derives edges per
/// scale.
pub fn enhance(src: &GrayImageView<'_>, params: &EdgeParams) -> GrayImage {
    // 1) denoise (skipped for inputs smaller than the kernel)
    let denoised = if params.denoise {
        bilateral_filter(
            src,
            params.bilateral_diameter,
            params.bilateral_sigma_color,
            params.bilateral_sigma_space,
        )
    } else {
        GrayImage {
            width: src.width,
            height: src.height,
            data: src.data.to_vec(),
        }
    };

    // 2) local contrast equalization + full-range stretch
    let equalized = clahe(&denoised.as_view(), params.clip_limit(), params.clahe_grid);
    normalize_minmax(&equalized.as_view())
}

/// Full preprocessing chain: [`enhance`], Gaussian smoothing, then the
/// double-threshold gradient edge map.
pub fn preprocess(src: &GrayImageView<'_>, params: &EdgeParams) -> GrayImage {
    let conditioned = enhance(src, params);
    let out = quick_edges(&conditioned.as_view(), params);
    log::debug!(
        "preprocess: {}x{} -> {} edge px",
        src.width,
        src.height,
        out.data.iter().filter(|&&v| v > 0).count()
    );
    out
}

/// Tail of the chain only: Gaussian smoothing plus the gradient edge map.
/// The scale search calls this on every resized target, where re-running
/// denoise and equalization would dominate the runtime without changing the
/// peak location.
pub fn quick_edges(src: &GrayImageView<'_>, params: &EdgeParams) -> GrayImage {
    let smoothed = gaussian_blur(src, params.blur_sigma);
    edge_map(&smoothed.as_view(), params)
}
