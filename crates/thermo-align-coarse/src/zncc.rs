use thermo_align_core::GrayImageView;

use crate::error::CoarseMatchError;

/// Template statistics precomputed once per search, shared by every scale
/// step and every window of the scan.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    pub width: usize,
    pub height: usize,
    values: Vec<f32>,
    mean: f32,
    norm: f64,
}

impl TemplatePlan {
    /// Validates the template up front: a zero-variance edge map can never
    /// produce a meaningful correlation peak.
    pub fn new(template: &GrayImageView<'_>) -> Result<Self, CoarseMatchError> {
        if template.width == 0 || template.height == 0 {
            return Err(CoarseMatchError::EmptyInput("template"));
        }

        let n = (template.width * template.height) as f64;
        let values: Vec<f32> = template.data.iter().map(|&v| v as f32).collect();
        let mean = (values.iter().map(|&v| v as f64).sum::<f64>() / n) as f32;
        let norm = values
            .iter()
            .map(|&v| {
                let d = (v - mean) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt();

        if norm < 1e-6 {
            return Err(CoarseMatchError::DegenerateTemplate);
        }

        Ok(Self {
            width: template.width,
            height: template.height,
            values,
            mean,
            norm,
        })
    }
}

/// Best-scoring window position of one scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub score: f32,
    pub x: usize,
    pub y: usize,
}

// Summed-area tables of pixel values and their squares, (w+1) x (h+1) with a
// zero border so window sums need no branching.
struct WindowSums {
    w: usize,
    sat: Vec<f64>,
    sat2: Vec<f64>,
}

impl WindowSums {
    fn build(target: &GrayImageView<'_>) -> Self {
        let w = target.width + 1;
        let h = target.height + 1;
        let mut sat = vec![0.0_f64; w * h];
        let mut sat2 = vec![0.0_f64; w * h];
        for y in 0..target.height {
            let mut row = 0.0_f64;
            let mut row2 = 0.0_f64;
            for x in 0..target.width {
                let v = target.data[y * target.width + x] as f64;
                row += v;
                row2 += v * v;
                sat[(y + 1) * w + (x + 1)] = sat[y * w + (x + 1)] + row;
                sat2[(y + 1) * w + (x + 1)] = sat2[y * w + (x + 1)] + row2;
            }
        }
        Self { w, sat, sat2 }
    }

    #[inline]
    fn window(&self, x: usize, y: usize, tw: usize, th: usize) -> (f64, f64) {
        let a = y * self.w + x;
        let b = y * self.w + (x + tw);
        let c = (y + th) * self.w + x;
        let d = (y + th) * self.w + (x + tw);
        (
            self.sat[d] - self.sat[b] - self.sat[c] + self.sat[a],
            self.sat2[d] - self.sat2[b] - self.sat2[c] + self.sat2[a],
        )
    }
}

#[inline]
fn window_score(
    plan: &TemplatePlan,
    target: &GrayImageView<'_>,
    sums: &WindowSums,
    x: usize,
    y: usize,
) -> f32 {
    let n = (plan.width * plan.height) as f64;
    let (sum_s, sum_s2) = sums.window(x, y, plan.width, plan.height);

    let var_term = sum_s2 - sum_s * sum_s / n;
    if var_term <= 1e-9 {
        // flat window: correlation undefined, score it neutral
        return 0.0;
    }

    let mut cross = 0.0_f64;
    for ty in 0..plan.height {
        let trow = ty * plan.width;
        let srow = (y + ty) * target.width + x;
        for tx in 0..plan.width {
            cross += plan.values[trow + tx] as f64 * target.data[srow + tx] as f64;
        }
    }

    let num = cross - plan.mean as f64 * sum_s;
    (num / (plan.norm * var_term.sqrt())) as f32
}

/// Scan every window of `target` and return the best peak, or `None` when
/// the target is smaller than the template. Ties keep the first window in
/// row-major scan order.
pub fn zncc_best(plan: &TemplatePlan, target: &GrayImageView<'_>) -> Option<Peak> {
    zncc_best_in(plan, target, 0, 0, usize::MAX, usize::MAX)
}

/// Like [`zncc_best`] but restricted to window origins inside
/// `[x0, x1) x [y0, y1)`, clamped to the valid range.
pub fn zncc_best_in(
    plan: &TemplatePlan,
    target: &GrayImageView<'_>,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
) -> Option<Peak> {
    if target.width < plan.width || target.height < plan.height {
        return None;
    }

    let max_x = target.width - plan.width;
    let max_y = target.height - plan.height;
    let x1 = x1.min(max_x + 1);
    let y1 = y1.min(max_y + 1);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let sums = WindowSums::build(target);
    let mut best: Option<Peak> = None;
    for y in y0..y1 {
        for x in x0..x1 {
            let score = window_score(plan, target, &sums, x, y);
            if best.map_or(true, |b| score > b.score) {
                best = Some(Peak { score, x, y });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermo_align_core::{crop_gray, GrayImage};

    fn textured(w: usize, h: usize) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| ((x * 7 + y * 13 + (x * y) % 5) % 256) as u8)
    }

    #[test]
    fn exact_embedding_peaks_at_its_origin() {
        let target = textured(40, 30);
        let template = crop_gray(&target.as_view(), 11, 7, 12, 9);
        let plan = TemplatePlan::new(&template.as_view()).unwrap();

        let peak = zncc_best(&plan, &target.as_view()).unwrap();
        assert_eq!((peak.x, peak.y), (11, 7));
        assert!(peak.score > 0.999, "score {}", peak.score);
    }

    #[test]
    fn inverted_content_scores_negative() {
        let target = textured(20, 20);
        let template = crop_gray(&target.as_view(), 4, 4, 8, 8);
        let inverted = GrayImage {
            width: 8,
            height: 8,
            data: template.data.iter().map(|&v| 255 - v).collect(),
        };
        let plan = TemplatePlan::new(&inverted.as_view()).unwrap();
        let sums = WindowSums::build(&target.as_view());
        let score = window_score(&plan, &target.as_view(), &sums, 4, 4);
        assert!(score < -0.999, "score {score}");
    }

    #[test]
    fn uniform_template_is_degenerate() {
        let flat = GrayImage {
            width: 6,
            height: 6,
            data: vec![255; 36],
        };
        assert!(matches!(
            TemplatePlan::new(&flat.as_view()),
            Err(CoarseMatchError::DegenerateTemplate)
        ));
    }

    #[test]
    fn flat_window_scores_zero_not_nan() {
        let template = textured(5, 5);
        let plan = TemplatePlan::new(&template.as_view()).unwrap();
        let target = GrayImage {
            width: 12,
            height: 12,
            data: vec![80; 144],
        };
        let sums = WindowSums::build(&target.as_view());
        let score = window_score(&plan, &target.as_view(), &sums, 0, 0);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn undersized_target_yields_none() {
        let template = textured(10, 10);
        let plan = TemplatePlan::new(&template.as_view()).unwrap();
        let target = textured(6, 12);
        assert!(zncc_best(&plan, &target.as_view()).is_none());
    }

    #[test]
    fn roi_restriction_skips_the_global_peak() {
        let target = textured(40, 30);
        let template = crop_gray(&target.as_view(), 2, 2, 8, 8);
        let plan = TemplatePlan::new(&template.as_view()).unwrap();

        let global = zncc_best(&plan, &target.as_view()).unwrap();
        assert_eq!((global.x, global.y), (2, 2));

        let restricted = zncc_best_in(&plan, &target.as_view(), 15, 10, 30, 20).unwrap();
        assert!(restricted.x >= 15 && restricted.y >= 10);
        assert!(restricted.score < global.score);
    }
}
