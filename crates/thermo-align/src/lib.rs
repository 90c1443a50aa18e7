//! High-level facade crate for the `thermo-align-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying pipeline crates
//! - (feature-gated) end-to-end helpers that decode a thermal/optical pair,
//!   run the alignment session and write the composites next to the inputs.
//!
//! ## Quickstart
//!
//! ```no_run
//! use thermo_align::run::{align_pair, PairOutputs};
//! use thermo_align::session::{AutoConfirm, PipelineConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let outputs = PairOutputs::for_base(Path::new("."), "scene", "png");
//! let mut confirm = AutoConfirm { min_confidence: config.min_confidence };
//!
//! let result = align_pair(
//!     Path::new("scene_thermal.png"),
//!     Path::new("scene_optical.png"),
//!     &config,
//!     None,
//!     None,
//!     &mut confirm,
//!     &outputs,
//! )?;
//! println!("score {:.3}", result.quality.score);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `thermo_align::core`: images, transforms, homographies, warping.
//! - `thermo_align::edges`: denoise, CLAHE and edge-map extraction.
//! - `thermo_align::coarse`: multi-scale template localization.
//! - `thermo_align::features`: keypoints, descriptors, RANSAC registration.
//! - `thermo_align::session`: the alignment state machine, composites and
//!   transform persistence.
//! - `thermo_align::run` / `thermo_align::batch` (feature `image`):
//!   end-to-end helpers from files on disk.

pub use thermo_align_coarse as coarse;
pub use thermo_align_core as core;
pub use thermo_align_edges as edges;
pub use thermo_align_features as features;
pub use thermo_align_session as session;

pub use thermo_align_coarse::{CoarseMatch, ScaleSearchParams, SearchPrior};
pub use thermo_align_core::{AffineMap, Homography, Transform};
pub use thermo_align_session::{
    AlignmentResult, AlignmentSession, PipelineConfig, RefineStrategy, TransformRecord,
};

#[cfg(feature = "image")]
pub mod batch;
#[cfg(feature = "image")]
pub mod run;
