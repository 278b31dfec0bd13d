//! Collaborator traits the scheduler drives, plus the wake payload.

use alarmd_core::{AlarmId, AlarmRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, TimerError};
use crate::resolver::NextAlarm;

/// Self-sufficient payload carried by an armed wake.
///
/// Holds a full snapshot of the target alarm so the receiving context can
/// act on it without a second store lookup (it may not have store access).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakePayload {
    pub alarm: AlarmRecord,
    pub fire_at: DateTime<Utc>,
    /// Whether this wake comes from a snooze override.
    pub snoozed: bool,
}

impl WakePayload {
    pub fn alarm_id(&self) -> AlarmId {
        self.alarm.id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TimerError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TimerError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<&NextAlarm> for WakePayload {
    fn from(next: &NextAlarm) -> Self {
        Self {
            alarm: next.alarm.clone(),
            fire_at: next.fire_at,
            snoozed: next.snoozed,
        }
    }
}

/// OS-level facility delivering a one-shot wake at an absolute time.
///
/// Only one wake is pending at a time: arming replaces any previous wake.
#[async_trait::async_trait]
pub trait WakeTimer: Send + Sync {
    /// Arm an exact one-shot wake at `at`, replacing any pending wake.
    async fn arm_exact(&self, at: DateTime<Utc>, payload: &WakePayload) -> Result<(), TimerError>;

    /// Cancel the pending wake, if any.
    async fn cancel(&self) -> Result<(), TimerError>;

    /// Human-readable name for this timer (e.g., "file", "memory").
    fn timer_name(&self) -> &str;
}

/// Notification / status surface (status-bar icon, snooze notifications).
#[async_trait::async_trait]
pub trait StatusSurface: Send + Sync {
    /// Show or hide the "alarm armed" indicator.
    async fn set_armed(&self, armed: bool) -> Result<(), SurfaceError>;

    /// Remove the notification keyed by `id` (e.g., a pending snooze).
    async fn cancel_notification(&self, id: AlarmId) -> Result<(), SurfaceError>;

    fn surface_name(&self) -> &str;
}

/// Overwrite-style external setting holding the formatted next alarm.
///
/// Empty string means no alarm is scheduled.
#[async_trait::async_trait]
pub trait NextAlarmSetting: Send + Sync {
    async fn publish(&self, formatted: &str) -> Result<(), SurfaceError>;
}
