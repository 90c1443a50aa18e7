use serde::{Deserialize, Serialize};

/// Configuration for the edge-map preprocessor.
///
/// Thermal frames are low-contrast and noisy, so the full chain runs
/// denoise -> local contrast equalization -> smoothing -> gradient edges.
/// The per-scale target pass uses only the tail of the chain (see
/// [`crate::quick_edges`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeParams {
    /// Apply the bilateral denoise step before equalization.
    pub denoise: bool,
    /// Bilateral kernel diameter in pixels. Images smaller than the kernel
    /// skip the denoise step entirely.
    pub bilateral_diameter: usize,
    /// Bilateral range sigma (intensity units).
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma (pixels).
    pub bilateral_sigma_space: f32,
    /// CLAHE clip limit as a multiple of the uniform histogram level.
    /// Useful range is 2.0..=10.0; values are clamped into it.
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid size (`n` gives an `n x n` grid).
    pub clahe_grid: usize,
    /// Gaussian sigma for the 5x5 pre-gradient smoothing pass.
    pub blur_sigma: f32,
    /// Gradient magnitudes below this never become edges.
    pub low_threshold: f32,
    /// Gradient magnitudes at or above this are unconditional edges; the
    /// band between the thresholds survives only via hysteresis.
    pub high_threshold: f32,
    /// Close single-pixel gaps in the strong-edge mask with a 3x3
    /// dilate/erode pass before hysteresis.
    pub closing: bool,
}

impl EdgeParams {
    /// Defaults for the thermal template: structure is faint, so keep the
    /// high threshold permissive.
    pub fn for_template() -> Self {
        Self {
            denoise: true,
            bilateral_diameter: 7,
            bilateral_sigma_color: 50.0,
            bilateral_sigma_space: 50.0,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            blur_sigma: 1.1,
            low_threshold: 50.0,
            high_threshold: 150.0,
            closing: true,
        }
    }

    /// Defaults for the optical target: plenty of texture, so a higher
    /// threshold suppresses clutter that would distract the correlation.
    pub fn for_target() -> Self {
        Self {
            high_threshold: 200.0,
            ..Self::for_template()
        }
    }

    /// Clip limit clamped into the range the equalizer accepts.
    pub(crate) fn clip_limit(&self) -> f32 {
        self.clahe_clip_limit.clamp(2.0, 10.0)
    }
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self::for_template()
    }
}
