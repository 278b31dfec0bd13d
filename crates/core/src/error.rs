use thiserror::Error;

use crate::alarm::AlarmId;

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("Alarm not found: {0}")]
    NotFound(AlarmId),

    #[error("Alarm store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Wake timer request failed: {0}")]
    TimerArm(String),

    #[error("Invalid alarm time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0} (the change itself was saved)")]
    Committed(Box<AlarmError>),
}

impl AlarmError {
    /// Whether the failure happened after the mutation was durably applied.
    ///
    /// A timer arm failure always qualifies: arming is the last step of every
    /// mutation and the next reconciliation retries it. Any other error
    /// raised after the store or snooze write is wrapped in
    /// [`AlarmError::Committed`]. Every other error means nothing changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, AlarmError::TimerArm(_) | AlarmError::Committed(_))
    }

    /// Mark an error raised after the mutation's durable write.
    pub fn committed(self) -> Self {
        if self.is_applied() {
            self
        } else {
            AlarmError::Committed(Box::new(self))
        }
    }
}

pub type Result<T> = std::result::Result<T, AlarmError>;
