//! In-memory alarm store.

use std::sync::RwLock;

use alarmd_core::{AlarmFilter, AlarmId, AlarmPatch, AlarmRecord};

use crate::error::StoreError;
use crate::table::AlarmTable;
use crate::traits::AlarmStore;

/// Volatile alarm store backed by a `RwLock`-guarded table.
///
/// Intended for tests and embedding; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAlarmStore {
    table: RwLock<AlarmTable>,
}

impl MemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AlarmStore for MemoryAlarmStore {
    async fn insert(&self, record: AlarmRecord) -> Result<AlarmId, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.insert(record))
    }

    async fn update(&self, id: AlarmId, patch: &AlarmPatch) -> Result<u64, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.update(id, patch))
    }

    async fn delete(&self, id: AlarmId) -> Result<u64, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.delete(id))
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
        "memory"
    }
}
