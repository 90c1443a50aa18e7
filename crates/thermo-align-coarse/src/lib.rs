//! Coarse localization: find where (and at what scale) the thermal template
//! sits inside the optical frame by correlating edge maps across a
//! descending scale ladder.

mod error;
mod params;
mod search;
mod zncc;

pub use error::CoarseMatchError;
pub use params::{ScaleSearchParams, SearchPrior};
pub use search::{locate, BoundingBox, CoarseMatch};
pub use zncc::{zncc_best, zncc_best_in, Peak, TemplatePlan};
