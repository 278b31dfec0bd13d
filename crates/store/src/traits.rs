//! AlarmStore trait definition.

use alarmd_core::{AlarmFilter, AlarmId, AlarmPatch, AlarmRecord};

use crate::error::StoreError;

/// Durable CRUD + predicate query over alarm definitions.
///
/// Every method is atomic for the single record it touches: readers never
/// observe a partially applied update, and a failed call changes nothing.
#[async_trait::async_trait]
pub trait AlarmStore: Send + Sync {
    /// Insert a new record, assigning and returning its id.
    ///
    /// The incoming `id` is ignored.
    async fn insert(&self, record: AlarmRecord) -> Result<AlarmId, StoreError>;

    /// Apply `patch` to the record with `id`. Returns rows affected (0 or 1).
    async fn update(&self, id: AlarmId, patch: &AlarmPatch) -> Result<u64, StoreError>;

    /// Delete the record with `id`. Returns rows affected (0 or 1).
    async fn delete(&self, id: AlarmId) -> Result<u64, StoreError>;

    async fn get(&self, id: AlarmId) -> Result<Option<AlarmRecord>, StoreError>;

    /// All records matching `filter`, ordered by id.
    async fn query(&self, filter: AlarmFilter) -> Result<Vec<AlarmRecord>, StoreError>;

    /// Human-readable name for this backend (e.g., "memory", "json").
    fn backend_name(&self) -> &str;
}
