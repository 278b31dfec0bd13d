//! JSON-file-backed alarm store.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use alarmd_core::{AlarmFilter, AlarmId, AlarmPatch, AlarmRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::table::AlarmTable;
use crate::traits::AlarmStore;

/// Filesystem-backed alarm persistence.
///
/// The whole table lives in a single JSON file:
/// ```text
/// alarms.json   ← { "next_id": 4, "alarms": [ ... ] }
/// ```
/// Each mutation is applied to a copy of the table, written to disk via a
/// temp file + rename, and only then swapped into memory. A failed write
/// leaves both the file and the in-memory table untouched.
pub struct JsonAlarmStore {
    path: PathBuf,
    table: RwLock<AlarmTable>,
}

impl JsonAlarmStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            let table: AlarmTable = serde_json::from_str(&json)?;
            table.reindex()
        } else {
            debug!(path = %path.display(), "alarm file not found, starting empty");
            AlarmTable::default()
        };

        let store = Self {
            path,
            table: RwLock::new(table),
        };
        info!(
            path = %store.path.display(),
            alarms = store.len()?,
            "Alarm store opened"
        );
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored alarms.
    pub fn len(&self) -> Result<usize, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.query(AlarmFilter::All).len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Apply `mutate` to a copy of the table, persist it, then commit.
    fn mutate<T>(&self, mutate: impl FnOnce(&mut AlarmTable) -> T) -> Result<T, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = table.clone();
        let out = mutate(&mut next);
        write_json_atomic(&self.path, &next)?;
        *table = next;
        Ok(out)
    }
}

#[async_trait::async_trait]
impl AlarmStore for JsonAlarmStore {
    async fn insert(&self, record: AlarmRecord) -> Result<AlarmId, StoreError> {
        self.mutate(|t| t.insert(record))
    }

    async fn update(&self, id: AlarmId, patch: &AlarmPatch) -> Result<u64, StoreError> {
        {
            let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
            if table.get(id).is_none() {
                return Ok(0);
            }
        }
        self.mutate(|t| t.update(id, patch))
    }

    async fn delete(&self, id: AlarmId) -> Result<u64, StoreError> {
        {
            let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
            if table.get(id).is_none() {
                return Ok(0);
            }
        }
        self.mutate(|t| t.delete(id))
    }

    async fn get(&self, id: AlarmId) -> Result<Option<AlarmRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.get(id).cloned())
    }

    async fn query(&self, filter: AlarmFilter) -> Result<Vec<AlarmRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.query(filter))
    }

    fn backend_name(&self) -> &str {
        "json"
    }
}

/// Write `value` as pretty JSON to `path` via a sibling temp file + rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
