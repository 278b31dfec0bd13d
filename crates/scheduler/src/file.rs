//! File-backed and log-only collaborators for hosts without an OS alarm
//! service.
//!
//! The file wake timer leaves the pending wake as a JSON file that an
//! external runner (cron, systemd timer, launchd) can poll.

use std::path::{Path, PathBuf};

use alarmd_core::AlarmId;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{SurfaceError, TimerError};
use crate::traits::{NextAlarmSetting, StatusSurface, WakePayload, WakeTimer};

// ── Wake timer ──────────────────────────────────────────────────────

/// Wake timer that persists the pending wake to a single JSON file.
///
/// Arming overwrites the file; cancelling removes it.
#[derive(Debug, Clone)]
pub struct FileWakeTimer {
    path: PathBuf,
}

impl FileWakeTimer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the currently pending wake, if any.
    pub async fn pending(&self) -> Result<Option<WakePayload>, TimerError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(WakePayload::from_bytes(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl WakeTimer for FileWakeTimer {
    async fn arm_exact(&self, at: DateTime<Utc>, payload: &WakePayload) -> Result<(), TimerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, payload.to_bytes()?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), at = %at, "wake file written");
        Ok(())
    }

    async fn cancel(&self) -> Result<(), TimerError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn timer_name(&self) -> &str {
        "file"
    }
}

// ── Status surface ──────────────────────────────────────────────────

/// Status surface that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSurface;

#[async_trait::async_trait]
impl StatusSurface for TracingStatusSurface {
    async fn set_armed(&self, armed: bool) -> Result<(), SurfaceError> {
        info!(armed, "Alarm indicator updated");
        Ok(())
    }

    async fn cancel_notification(&self, id: AlarmId) -> Result<(), SurfaceError> {
        info!(alarm_id = %id, "Snooze notification cancelled");
        Ok(())
    }

    fn surface_name(&self) -> &str {
        "tracing"
    }
}

// ── Next alarm setting ──────────────────────────────────────────────

/// Next-alarm string kept in a plain text file.
#[derive(Debug, Clone)]
pub struct FileNextAlarmSetting {
    path: PathBuf,
}

impl FileNextAlarmSetting {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the published string (empty when unset).
    pub async fn read(&self) -> Result<String, SurfaceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl NextAlarmSetting for FileNextAlarmSetting {
    async fn publish(&self, formatted: &str) -> Result<(), SurfaceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, formatted).await?;
        debug!(
            path = %self.path.display(),
            value = if formatted.is_empty() { "null" } else { formatted },
            "next alarm string written"
        );
        Ok(())
    }
}
