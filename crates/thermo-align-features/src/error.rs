/// Errors from feature-based registration.
#[derive(thiserror::Error, Debug)]
pub enum RegisterError {
    /// Too few correspondences survived matching to constrain a homography.
    /// Callers fall back to the coarse affine when they see this.
    #[error("not enough matches to fit a homography: found {found}, need {needed}")]
    InsufficientMatches { found: usize, needed: usize },
    /// No minimal sample produced a model with any inlier support.
    #[error("consensus search failed after {iterations} iterations")]
    NoConsensus { iterations: usize },
}
