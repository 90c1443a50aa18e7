use thermo_align_coarse::CoarseMatchError;

/// IO wrapper for the JSON artifacts (pipeline config, transform records).
#[derive(thiserror::Error, Debug)]
pub enum SessionIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors that abort an alignment session.
///
/// Feature-refinement failures never show up here: the session falls back
/// to the coarse affine and degrades the quality report instead.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Coarse(#[from] CoarseMatchError),
    /// Confirmation provider IO (interactive prompts).
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("alignment not accepted after {attempts} attempt(s)")]
    Unresolved { attempts: usize },
}
