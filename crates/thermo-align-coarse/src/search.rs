use thermo_align_core::{resize_to_width, AffineMap, GrayImageView};
use thermo_align_edges::{quick_edges, EdgeParams};

use crate::error::CoarseMatchError;
use crate::params::{ScaleSearchParams, SearchPrior};
use crate::zncc::{zncc_best, zncc_best_in, Peak, TemplatePlan};

/// Template location in full-resolution target pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Outcome of the multi-scale sweep.
#[derive(Clone, Copy, Debug)]
pub struct CoarseMatch {
    pub bbox: BoundingBox,
    /// Peak normalized correlation, in [-1, 1].
    pub score: f32,
    /// Target scale at which the peak was found.
    pub scale: f32,
}

impl CoarseMatch {
    /// The optical-to-thermal affine this match implies: cropping the bbox
    /// out of the optical frame and resizing it onto `thermal_w x thermal_h`.
    pub fn to_thermal_affine(&self, thermal_w: usize, thermal_h: usize) -> AffineMap {
        let scale_x = thermal_w as f64 / self.bbox.width as f64;
        let scale_y = thermal_h as f64 / self.bbox.height as f64;
        AffineMap {
            scale_x,
            scale_y,
            translation_x: -(self.bbox.x as f64) * scale_x,
            translation_y: -(self.bbox.y as f64) * scale_y,
        }
    }
}

fn scale_ladder(params: &ScaleSearchParams, prior: Option<&SearchPrior>) -> Vec<f32> {
    let full = params.scales();
    let Some(hint) = prior.and_then(|p| p.scale_hint) else {
        return full;
    };
    let window = prior.map(|p| p.scale_window).unwrap_or(0.0);
    let narrowed: Vec<f32> = full
        .iter()
        .copied()
        .filter(|s| (s - hint).abs() <= window)
        .collect();
    if narrowed.is_empty() {
        log::warn!(
            "scale hint {hint:.3} +- {window:.3} misses the ladder, searching the full range"
        );
        return full;
    }
    narrowed
}

fn peak_at_scale(
    plan: &TemplatePlan,
    edges: &GrayImageView<'_>,
    scale: f32,
    prior: Option<&SearchPrior>,
) -> Option<Peak> {
    match prior.and_then(|p| p.offset_hint.map(|o| (o, p.offset_window))) {
        Some(((ox, oy), window)) => {
            let x0 = (((ox - window) * scale).floor().max(0.0)) as usize;
            let y0 = (((oy - window) * scale).floor().max(0.0)) as usize;
            let x1 = (((ox + window) * scale).ceil().max(0.0)) as usize + 1;
            let y1 = (((oy + window) * scale).ceil().max(0.0)) as usize + 1;
            zncc_best_in(plan, edges, x0, y0, x1, y1)
        }
        None => zncc_best(plan, edges),
    }
}

/// Sweep the scale ladder from large to small, correlating the template edge
/// map against the edge map of every resized target. The best strictly
/// greater peak wins, so an exact tie resolves to the larger scale.
///
/// `target` is the enhanced (denoised + equalized) grayscale optical frame;
/// only the cheap blur+gradient tail reruns per scale.
pub fn locate(
    template_edges: &GrayImageView<'_>,
    target: &GrayImageView<'_>,
    target_edge_params: &EdgeParams,
    params: &ScaleSearchParams,
    prior: Option<&SearchPrior>,
) -> Result<CoarseMatch, CoarseMatchError> {
    let plan = TemplatePlan::new(template_edges)?;
    if target.width == 0 || target.height == 0 {
        return Err(CoarseMatchError::EmptyInput("target"));
    }

    struct Best {
        peak: Peak,
        scale: f32,
        resized_w: usize,
    }
    let mut best: Option<Best> = None;

    for scale in scale_ladder(params, prior) {
        let new_w = (target.width as f32 * scale).round() as usize;
        if new_w < plan.width {
            break;
        }
        let resized = resize_to_width(target, new_w);
        if resized.height < plan.height {
            break;
        }

        let edges = quick_edges(&resized.as_view(), target_edge_params);
        let Some(peak) = peak_at_scale(&plan, &edges.as_view(), scale, prior) else {
            continue;
        };
        log::debug!(
            "scale {scale:.3}: peak {:.4} at ({}, {})",
            peak.score,
            peak.x,
            peak.y
        );

        if best.as_ref().map_or(true, |b| peak.score > b.peak.score) {
            best = Some(Best {
                peak,
                scale,
                resized_w: resized.width,
            });
        }
    }

    let Some(best) = best else {
        return Err(CoarseMatchError::NoScaleFits {
            template_w: plan.width,
            template_h: plan.height,
            target_w: target.width,
            target_h: target.height,
        });
    };

    let ratio = target.width as f32 / best.resized_w as f32;
    let x = (best.peak.x as f32 * ratio) as u32;
    let y = (best.peak.y as f32 * ratio) as u32;
    let width = ((plan.width as f32 * ratio) as u32).min(target.width as u32 - x);
    let height = ((plan.height as f32 * ratio) as u32).min(target.height as u32 - y);

    let found = CoarseMatch {
        bbox: BoundingBox {
            x,
            y,
            width,
            height,
        },
        score: best.peak.score,
        scale: best.scale,
    };
    log::info!(
        "coarse match: scale {:.3} score {:.4} bbox ({}, {}, {}, {})",
        found.scale,
        found.score,
        x,
        y,
        width,
        height
    );
    Ok(found)
}
