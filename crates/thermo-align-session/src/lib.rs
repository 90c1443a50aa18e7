//! Session orchestration for thermal/optical alignment: pipeline
//! configuration, the coarse-to-refined state machine, review composites
//! and transform persistence.

pub mod compositor;
pub mod config;
pub mod error;
pub mod points;
pub mod session;
pub mod store;

pub use compositor::{blend, blend_edge_emphasis, gray_to_rgb, hconcat};
pub use config::PipelineConfig;
pub use error::{SessionError, SessionIoError};
pub use points::{affine_from_pairs, PointPair, PointPairSource, PresetPairs};
pub use session::{
    AlignmentResult, AlignmentSession, AutoConfirm, ConfirmationProvider, RefineStrategy,
    SessionState, StdinConfirm,
};
pub use store::{QualityReport, TransformRecord, TransformRepr};
