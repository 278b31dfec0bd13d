//! Collaborator error types.

use alarmd_core::AlarmError;

/// Errors raised by a wake timer.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("wake timer rejected request: {0}")]
    Rejected(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<TimerError> for AlarmError {
    fn from(e: TimerError) -> Self {
        AlarmError::TimerArm(e.to_string())
    }
}

/// Errors raised by the status surface or the next-alarm setting.
///
/// These are logged and never fail a scheduler operation.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("surface unavailable: {0}")]
    Unavailable(String),
}
