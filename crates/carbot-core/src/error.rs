//! Error types for the carbot panel.

use thiserror::Error;

/// Panel-wide errors.
///
/// None of these are fatal to the host: transport and timeout failures
/// surface as a "no data" state, validation failures are rejected before any
/// network call, and `Conflict` is recovered locally by a one-shot rename
/// retry before it escalates to `CreateFailed`.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("malformed payload: {0}")]
    Decode(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("name conflict: {0}")]
    Conflict(String),

    #[error("create failed after rename retry: {0}")]
    CreateFailed(String),

    #[error("run rejected: {0}")]
    RunFailed(String),

    #[error("session closed")]
    Closed,
}

impl PanelError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PanelError::Conflict(_))
    }
}

/// Result type for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;
