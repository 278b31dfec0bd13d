//! In-memory collaborators that record what the scheduler asked of them.
//!
//! Useful for embedding the scheduler in a host that polls state, and for
//! tests.

use std::sync::Mutex;

use alarmd_core::AlarmId;
use chrono::{DateTime, Utc};

use crate::error::{SurfaceError, TimerError};
use crate::traits::{NextAlarmSetting, StatusSurface, WakePayload, WakeTimer};

/// A single request made to a [`RecordingWakeTimer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCall {
    Arm { at: DateTime<Utc>, payload: WakePayload },
    Cancel,
}

/// Wake timer that records accepted calls and can be told to reject arm or
/// cancel requests.
#[derive(Debug, Default)]
pub struct RecordingWakeTimer {
    calls: Mutex<Vec<TimerCall>>,
    reject: Mutex<Option<String>>,
    reject_cancel: Mutex<Option<String>>,
}

impl RecordingWakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent arm request with `reason`, or accept again
    /// with `None`.
    pub fn set_rejecting(&self, reason: Option<&str>) {
        *self.reject.lock().unwrap_or_else(|e| e.into_inner()) = reason.map(str::to_string);
    }

    /// Reject every subsequent cancel request with `reason`, or accept again
    /// with `None`.
    pub fn set_cancel_rejecting(&self, reason: Option<&str>) {
        *self.reject_cancel.lock().unwrap_or_else(|e| e.into_inner()) = reason.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<TimerCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The pending wake, if the most recent accepted call was an arm.
    pub fn pending(&self) -> Option<(DateTime<Utc>, WakePayload)> {
        match self.calls().last() {
            Some(TimerCall::Arm { at, payload }) => Some((*at, payload.clone())),
            _ => None,
        }
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait::async_trait]
impl WakeTimer for RecordingWakeTimer {
    async fn arm_exact(&self, at: DateTime<Utc>, payload: &WakePayload) -> Result<(), TimerError> {
        if let Some(reason) = self.reject.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(TimerError::PermissionDenied(reason));
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(TimerCall::Arm {
                at,
                payload: payload.clone(),
            });
        Ok(())
    }

    async fn cancel(&self) -> Result<(), TimerError> {
        if let Some(reason) = self.reject_cancel.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(TimerError::Rejected(reason));
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(TimerCall::Cancel);
        Ok(())
    }

    fn timer_name(&self) -> &str {
        "memory"
    }
}

/// Status surface that remembers the armed flag and cancelled notifications.
#[derive(Debug, Default)]
pub struct RecordingStatusSurface {
    armed: Mutex<Option<bool>>,
    cancelled: Mutex<Vec<AlarmId>>,
}

impl RecordingStatusSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last armed flag set, `None` if never set.
    pub fn armed(&self) -> Option<bool> {
        *self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ids whose notifications were cancelled, in call order.
    pub fn cancelled(&self) -> Vec<AlarmId> {
        self.cancelled.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl StatusSurface for RecordingStatusSurface {
    async fn set_armed(&self, armed: bool) -> Result<(), SurfaceError> {
        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = Some(armed);
        Ok(())
    }

    async fn cancel_notification(&self, id: AlarmId) -> Result<(), SurfaceError> {
        self.cancelled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
        Ok(())
    }

    fn surface_name(&self) -> &str {
        "memory"
    }
}

/// Next-alarm setting held in memory.
#[derive(Debug, Default)]
pub struct MemoryNextAlarmSetting {
    value: Mutex<String>,
}

impl MemoryNextAlarmSetting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> String {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl NextAlarmSetting for MemoryNextAlarmSetting {
    async fn publish(&self, formatted: &str) -> Result<(), SurfaceError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = formatted.to_string();
        Ok(())
    }
}
