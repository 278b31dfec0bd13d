//! Durable backing for snooze overrides.
//!
//! A snooze override maps an alarm id to the absolute instant the snoozed
//! alarm should fire again. The registry that owns the overrides lives in the
//! scheduler crate; this module only persists the map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use alarmd_core::AlarmId;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::file::write_json_atomic;

/// Alarm id → snooze fire time. At most one override per id.
pub type SnoozeMap = BTreeMap<AlarmId, DateTime<Utc>>;

/// Process-durable key/value state for snooze overrides.
///
/// `save` replaces the whole map atomically: after an error the previously
/// saved map is still what `load` returns.
pub trait SnoozeBackend: Send + Sync {
    fn load(&self) -> Result<SnoozeMap, StoreError>;

    fn save(&self, snoozes: &SnoozeMap) -> Result<(), StoreError>;
}

/// Volatile snooze backend.
#[derive(Debug, Default)]
pub struct MemorySnoozeBackend {
    snoozes: Mutex<SnoozeMap>,
}

impl MemorySnoozeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnoozeBackend for MemorySnoozeBackend {
    fn load(&self) -> Result<SnoozeMap, StoreError> {
        let snoozes = self.snoozes.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(snoozes.clone())
    }

    fn save(&self, snoozes: &SnoozeMap) -> Result<(), StoreError> {
        let mut current = self.snoozes.lock().map_err(|_| StoreError::Poisoned)?;
        *current = snoozes.clone();
        Ok(())
    }
}

/// Snooze overrides persisted to a JSON file:
/// ```text
/// snoozes.json   ← { "3": "2026-10-19T07:10:00Z" }
/// ```
#[derive(Debug, Clone)]
pub struct JsonSnoozeBackend {
    path: PathBuf,
}

impl JsonSnoozeBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnoozeBackend for JsonSnoozeBackend {
    fn load(&self) -> Result<SnoozeMap, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "snooze file not found, no overrides");
            return Ok(SnoozeMap::new());
        }
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, snoozes: &SnoozeMap) -> Result<(), StoreError> {
        write_json_atomic(&self.path, snoozes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn json_backend_persists_map() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = JsonSnoozeBackend::new(tmp.path().join("snoozes.json"));
        assert!(backend.load().unwrap().is_empty());

        let mut map = SnoozeMap::new();
        map.insert(AlarmId(3), at("2026-10-19T07:10:00Z"));
        map.insert(AlarmId(12), at("2026-10-19T08:00:00Z"));
        backend.save(&map).unwrap();

        let reopened = JsonSnoozeBackend::new(tmp.path().join("snoozes.json"));
        assert_eq!(reopened.load().unwrap(), map);
    }

    #[test]
    fn memory_backend_replaces_map() {
        let backend = MemorySnoozeBackend::new();
        let mut map = SnoozeMap::new();
        map.insert(AlarmId(1), at("2026-10-19T07:10:00Z"));
        backend.save(&map).unwrap();
        backend.save(&SnoozeMap::new()).unwrap();
        assert!(backend.load().unwrap().is_empty());
    }
}
