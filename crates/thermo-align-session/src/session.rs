//! The alignment session: coarse -> refine -> confirm -> accept.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use thermo_align_coarse::{locate, CoarseMatch, SearchPrior};
use thermo_align_core::{warp_gray, GrayImage, GrayImageView, RgbImage, Transform};
use thermo_align_edges::{enhance, preprocess, quick_edges};
use thermo_align_features::register;

use crate::compositor::{blend, gray_to_rgb};
use crate::config::PipelineConfig;
use crate::error::SessionError;
use crate::points::{affine_from_pairs, PointPairSource};
use crate::store::QualityReport;

/// How the coarse affine gets refined before confirmation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStrategy {
    /// Keep the coarse affine as-is.
    None,
    /// Solve an affine from two operator-supplied correspondences.
    PointPairs,
    /// Feature matching and a robust homography fit.
    #[default]
    Features,
}

/// Where a session currently stands. Transitions are logged at debug level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    CoarseLocated,
    Refined,
    AwaitingConfirmation,
    Accepted,
    Retrying,
}

/// Decides whether a proposed alignment is good enough to persist.
pub trait ConfirmationProvider {
    /// Inspect the audit composite and the quality block. `Ok(false)` sends
    /// the session into a retry.
    fn confirm(&mut self, composite: &RgbImage, quality: &QualityReport) -> io::Result<bool>;
}

/// Accepts when the coarse score clears a floor. Installed by the batch
/// driver, which must never block on input.
pub struct AutoConfirm {
    pub min_confidence: f32,
}

impl ConfirmationProvider for AutoConfirm {
    fn confirm(&mut self, _composite: &RgbImage, quality: &QualityReport) -> io::Result<bool> {
        Ok(quality.score >= self.min_confidence)
    }
}

/// Interactive y/n prompt; anything else re-prompts. EOF counts as a no.
pub struct StdinConfirm;

impl ConfirmationProvider for StdinConfirm {
    fn confirm(&mut self, _composite: &RgbImage, quality: &QualityReport) -> io::Result<bool> {
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            eprint!(
                "accept alignment (score {:.3}, {} inliers)? [y/n] ",
                quality.score, quality.inliers
            );
            io::stderr().flush()?;
            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(false);
            }
            match line.trim() {
                "y" | "Y" | "yes" => return Ok(true),
                "n" | "N" | "no" => return Ok(false),
                _ => {}
            }
        }
    }
}

/// Accepted alignment plus the bookkeeping reports want.
#[derive(Clone, Debug)]
pub struct AlignmentResult {
    /// Optical-to-thermal mapping.
    pub transform: Transform,
    pub quality: QualityReport,
    /// Where the thermal frame landed in the optical frame.
    pub coarse: CoarseMatch,
    /// 1-based attempt number that was accepted.
    pub attempts: usize,
    /// Refinement was requested but the coarse affine was kept.
    pub used_fallback: bool,
}

enum Attempt {
    Accepted(AlignmentResult),
    Rejected,
}

/// Drives one thermal/optical pair through the full pipeline.
pub struct AlignmentSession {
    config: PipelineConfig,
    state: SessionState,
}

impl AlignmentSession {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: SessionState::AwaitingInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn transition(&mut self, to: SessionState) {
        log::debug!("session state: {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// Search parameters for retry `attempt` (0-based; 0 is the configured
    /// search). The schedule is fixed, so a rerun walks through exactly the
    /// same widening steps.
    fn widened(&self, attempt: usize) -> PipelineConfig {
        let mut cfg = self.config.clone();
        if attempt == 0 {
            return cfg;
        }
        let k = attempt as f32;
        cfg.search.min_scale = (cfg.search.min_scale - 0.1 * k).max(0.05);
        cfg.features.max_keypoints =
            (cfg.features.max_keypoints as f32 * 1.5f32.powf(k)) as usize;
        cfg.features.ransac.inlier_threshold += 0.5 * k;
        cfg
    }

    /// Run the session to acceptance or exhaustion.
    ///
    /// `pairs` is only consulted under [`RefineStrategy::PointPairs`]. Coarse
    /// localization failures abort immediately; refinement failures fall
    /// back to the coarse affine; rejected confirmations retry with a
    /// widened search until `max_attempts` is spent.
    pub fn run(
        &mut self,
        thermal: &GrayImageView<'_>,
        optical: &GrayImageView<'_>,
        prior: Option<&SearchPrior>,
        mut pairs: Option<&mut dyn PointPairSource>,
        confirm: &mut dyn ConfirmationProvider,
    ) -> Result<AlignmentResult, SessionError> {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 0..attempts {
            let cfg = self.widened(attempt);
            if attempt > 0 {
                log::info!(
                    "retry {attempt}: min_scale {:.2}, {} keypoints, inlier threshold {:.1}px",
                    cfg.search.min_scale,
                    cfg.features.max_keypoints,
                    cfg.features.ransac.inlier_threshold
                );
            }
            self.transition(SessionState::AwaitingInput);

            match self.attempt_once(thermal, optical, prior, pairs.as_deref_mut(), confirm, &cfg)? {
                Attempt::Accepted(mut result) => {
                    result.attempts = attempt + 1;
                    self.transition(SessionState::Accepted);
                    return Ok(result);
                }
                Attempt::Rejected => self.transition(SessionState::Retrying),
            }
        }
        Err(SessionError::Unresolved { attempts })
    }

    fn attempt_once(
        &mut self,
        thermal: &GrayImageView<'_>,
        optical: &GrayImageView<'_>,
        prior: Option<&SearchPrior>,
        pairs: Option<&mut (dyn PointPairSource + '_)>,
        confirm: &mut dyn ConfirmationProvider,
        cfg: &PipelineConfig,
    ) -> Result<Attempt, SessionError> {
        // 1) edge maps and coarse location
        let template_edges = preprocess(thermal, &cfg.template_edges);
        let target_enhanced = enhance(optical, &cfg.target_edges);
        let coarse = locate(
            &template_edges.as_view(),
            &target_enhanced.as_view(),
            &cfg.target_edges,
            &cfg.search,
            prior,
        )?;
        self.transition(SessionState::CoarseLocated);
        if coarse.score < cfg.search.min_score {
            log::warn!(
                "coarse score {:.3} below floor {:.3}",
                coarse.score,
                cfg.search.min_score
            );
            return Ok(Attempt::Rejected);
        }

        // 2) refinement
        let (transform, quality, used_fallback) = self.refine(
            thermal,
            &template_edges,
            &target_enhanced,
            &coarse,
            pairs,
            cfg,
        );
        self.transition(SessionState::Refined);

        // 3) confirmation over the blended composite
        let composite = match transform.inverse() {
            Some(inv) => {
                let warped = warp_gray(optical, &inv, thermal.width, thermal.height);
                blend(
                    &gray_to_rgb(thermal),
                    &gray_to_rgb(&warped.as_view()),
                    cfg.blend_alpha,
                )
            }
            None => {
                log::warn!("transform not invertible, compositing unwarped frames");
                blend(&gray_to_rgb(thermal), &gray_to_rgb(optical), cfg.blend_alpha)
            }
        };
        self.transition(SessionState::AwaitingConfirmation);

        if confirm.confirm(&composite, &quality)? {
            Ok(Attempt::Accepted(AlignmentResult {
                transform,
                quality,
                coarse,
                attempts: 0,
                used_fallback,
            }))
        } else {
            log::info!("alignment rejected at confirmation");
            Ok(Attempt::Rejected)
        }
    }

    fn refine(
        &self,
        thermal: &GrayImageView<'_>,
        template_edges: &GrayImage,
        target_enhanced: &GrayImage,
        coarse: &CoarseMatch,
        pairs: Option<&mut (dyn PointPairSource + '_)>,
        cfg: &PipelineConfig,
    ) -> (Transform, QualityReport, bool) {
        let base = Transform::Affine(coarse.to_thermal_affine(thermal.width, thermal.height));
        let coarse_quality = QualityReport {
            score: coarse.score,
            inliers: 0,
            inlier_ratio: 0.0,
            ill_conditioned: false,
        };

        match cfg.refine {
            RefineStrategy::None => (base, coarse_quality, false),
            RefineStrategy::PointPairs => {
                let solved = pairs
                    .and_then(|s| s.point_pairs())
                    .and_then(|p| affine_from_pairs(&p));
                match solved {
                    Some(a) => (Transform::Affine(a), coarse_quality, false),
                    None => {
                        log::warn!("no usable point pairs, keeping the coarse affine");
                        (base, coarse_quality, true)
                    }
                }
            }
            RefineStrategy::Features => {
                // registration runs on edge maps in the thermal frame
                let Some(base_inv) = base.inverse() else {
                    return (
                        base,
                        QualityReport {
                            ill_conditioned: true,
                            ..coarse_quality
                        },
                        true,
                    );
                };
                let warped = warp_gray(
                    &target_enhanced.as_view(),
                    &base_inv,
                    thermal.width,
                    thermal.height,
                );
                let warped_edges = quick_edges(&warped.as_view(), &cfg.target_edges);
                match register(
                    &warped_edges.as_view(),
                    &template_edges.as_view(),
                    &cfg.features,
                ) {
                    Ok(reg) => {
                        let refined =
                            Transform::compose(&Transform::Projective(reg.homography), &base);
                        let quality = QualityReport {
                            score: coarse.score,
                            inliers: reg.inlier_count,
                            inlier_ratio: reg.inlier_ratio,
                            ill_conditioned: reg.ill_conditioned,
                        };
                        (refined, quality, false)
                    }
                    Err(err) => {
                        log::warn!("feature refinement failed ({err}), keeping the coarse affine");
                        (
                            base,
                            QualityReport {
                                ill_conditioned: true,
                                ..coarse_quality
                            },
                            true,
                        )
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{PointPair, PresetPairs};
    use nalgebra::Point2;
    use thermo_align_core::crop_gray;

    // 2x2 dots; single pixels smooth below the gradient thresholds
    fn speckle(width: usize, height: usize, seed: u64) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        let count = width * height / 48;
        for _ in 0..count {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let x = ((state >> 33) % (width - 1) as u64) as usize;
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let y = ((state >> 33) % (height - 1) as u64) as usize;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                img.set(x + dx, y + dy, 255);
            }
        }
        img
    }

    /// Optical scene plus a thermal frame that is exactly its (30,20)+60x45
    /// sub-window, so scale 1.0 and bbox (30,20,60,45) are the truth.
    fn scene() -> (GrayImage, GrayImage) {
        let optical = speckle(120, 90, 4242);
        let thermal = crop_gray(&optical.as_view(), 30, 20, 60, 45);
        (optical, thermal)
    }

    fn narrow_config(refine: RefineStrategy) -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.search.min_scale = 0.9;
        cfg.search.max_scale = 1.0;
        cfg.search.steps = 2;
        cfg.search.min_score = 0.1;
        cfg.refine = refine;
        cfg
    }

    struct RejectAll {
        calls: usize,
    }

    impl ConfirmationProvider for RejectAll {
        fn confirm(&mut self, _c: &RgbImage, _q: &QualityReport) -> io::Result<bool> {
            self.calls += 1;
            Ok(false)
        }
    }

    #[test]
    fn coarse_only_session_accepts_the_located_window() {
        let (optical, thermal) = scene();
        let mut session = AlignmentSession::new(narrow_config(RefineStrategy::None));
        let mut confirm = AutoConfirm {
            min_confidence: 0.1,
        };

        let result = session
            .run(
                &thermal.as_view(),
                &optical.as_view(),
                None,
                None,
                &mut confirm,
            )
            .unwrap();

        assert_eq!(session.state(), SessionState::Accepted);
        assert_eq!(result.attempts, 1);
        assert!(!result.used_fallback);
        assert!(result.quality.score > 0.5, "score {}", result.quality.score);
        let bbox = result.coarse.bbox;
        assert!(bbox.x.abs_diff(30) <= 1 && bbox.y.abs_diff(20) <= 1, "{bbox:?}");
        match result.transform {
            Transform::Affine(a) => {
                assert!((a.scale_x - 1.0).abs() < 0.05, "{a:?}");
                assert!((a.translation_x + 30.0).abs() < 2.0, "{a:?}");
                assert!((a.translation_y + 20.0).abs() < 2.0, "{a:?}");
            }
            other => panic!("expected an affine, got {other:?}"),
        }
    }

    #[test]
    fn rejection_runs_out_of_attempts() {
        let (optical, thermal) = scene();
        let mut cfg = narrow_config(RefineStrategy::None);
        cfg.max_attempts = 3;
        let mut session = AlignmentSession::new(cfg);
        let mut confirm = RejectAll { calls: 0 };

        let err = session
            .run(
                &thermal.as_view(),
                &optical.as_view(),
                None,
                None,
                &mut confirm,
            )
            .unwrap_err();

        match err {
            SessionError::Unresolved { attempts } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(confirm.calls, 3);
        assert_eq!(session.state(), SessionState::Retrying);
    }

    #[test]
    fn starved_feature_refinement_falls_back_to_the_coarse_affine() {
        let (optical, thermal) = scene();
        let mut cfg = narrow_config(RefineStrategy::Features);
        // two keypoints can never yield the four matches RANSAC needs
        cfg.features.max_keypoints = 2;
        let mut session = AlignmentSession::new(cfg);
        let mut confirm = AutoConfirm {
            min_confidence: 0.1,
        };

        let result = session
            .run(
                &thermal.as_view(),
                &optical.as_view(),
                None,
                None,
                &mut confirm,
            )
            .unwrap();

        assert_eq!(session.state(), SessionState::Accepted);
        assert!(result.used_fallback);
        assert!(result.quality.ill_conditioned);
        assert_eq!(result.quality.inliers, 0);
        assert!(matches!(result.transform, Transform::Affine(_)));
    }

    #[test]
    fn point_pair_refinement_overrides_the_coarse_affine() {
        let (optical, thermal) = scene();
        let mut session = AlignmentSession::new(narrow_config(RefineStrategy::PointPairs));
        let mut confirm = AutoConfirm {
            min_confidence: 0.1,
        };
        let mut source = PresetPairs(Some([
            PointPair {
                optical: Point2::new(40.0, 30.0),
                thermal: Point2::new(5.0, 5.0),
            },
            PointPair {
                optical: Point2::new(140.0, 110.0),
                thermal: Point2::new(55.0, 45.0),
            },
        ]));

        let result = session
            .run(
                &thermal.as_view(),
                &optical.as_view(),
                None,
                Some(&mut source),
                &mut confirm,
            )
            .unwrap();

        assert!(!result.used_fallback);
        match result.transform {
            Transform::Affine(a) => {
                assert!((a.scale_x - 0.5).abs() < 1e-6, "{a:?}");
                assert!((a.scale_y - 0.5).abs() < 1e-6, "{a:?}");
                assert!((a.translation_x + 15.0).abs() < 1e-6, "{a:?}");
                assert!((a.translation_y + 10.0).abs() < 1e-6, "{a:?}");
            }
            other => panic!("expected an affine, got {other:?}"),
        }
    }

    #[test]
    fn widening_schedule_is_deterministic_and_monotone() {
        let session = AlignmentSession::new(PipelineConfig::default());
        let w0 = session.widened(0);
        assert!((w0.search.min_scale - 0.45).abs() < f32::EPSILON);
        assert_eq!(w0.features.max_keypoints, 400);

        let w2 = session.widened(2);
        assert!((w2.search.min_scale - 0.25).abs() < 1e-6);
        assert_eq!(w2.features.max_keypoints, 900);
        assert!((w2.features.ransac.inlier_threshold - 4.0).abs() < 1e-6);
    }

    #[test]
    fn auto_confirm_applies_the_floor() {
        let composite = RgbImage::new(1, 1);
        let mut confirm = AutoConfirm {
            min_confidence: 0.25,
        };
        let good = QualityReport {
            score: 0.3,
            inliers: 0,
            inlier_ratio: 0.0,
            ill_conditioned: false,
        };
        let bad = QualityReport { score: 0.2, ..good };
        assert!(confirm.confirm(&composite, &good).unwrap());
        assert!(!confirm.confirm(&composite, &bad).unwrap());
    }
}
