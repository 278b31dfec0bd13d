//! Shared record table used by the in-memory and JSON stores.

use std::collections::BTreeMap;

use alarmd_core::{AlarmFilter, AlarmId, AlarmPatch, AlarmRecord};
use serde::{Deserialize, Serialize};

/// Id-keyed alarm records plus the id allocator.
///
/// Ids are allocated monotonically and never handed out twice, even after
/// the highest id is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AlarmTable {
    next_id: i64,
    alarms: Vec<AlarmRecord>,
    #[serde(skip)]
    index: BTreeMap<AlarmId, usize>,
}

impl Default for AlarmTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            alarms: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl AlarmTable {
    /// Rebuild the id index after deserialization.
    pub(crate) fn reindex(mut self) -> Self {
        self.alarms.sort_by_key(|a| a.id);
        self.index = self
            .alarms
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id, i))
            .collect();
        let max_id = self.alarms.iter().map(|a| a.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self
    }

    pub(crate) fn insert(&mut self, mut record: AlarmRecord) -> AlarmId {
        let id = AlarmId(self.next_id);
        self.next_id += 1;
        record.id = id;
        self.index.insert(id, self.alarms.len());
        self.alarms.push(record);
        id
    }

    pub(crate) fn update(&mut self, id: AlarmId, patch: &AlarmPatch) -> u64 {
        match self.index.get(&id) {
            Some(&i) => {
                patch.apply(&mut self.alarms[i]);
                1
            }
            None => 0,
        }
    }

    pub(crate) fn delete(&mut self, id: AlarmId) -> u64 {
        match self.index.remove(&id) {
            Some(i) => {
                self.alarms.remove(i);
                for slot in self.index.values_mut() {
                    if *slot > i {
                        *slot -= 1;
                    }
                }
                1
            }
            None => 0,
        }
    }

    pub(crate) fn get(&self, id: AlarmId) -> Option<&AlarmRecord> {
        self.index.get(&id).map(|&i| &self.alarms[i])
    }

    pub(crate) fn query(&self, filter: AlarmFilter) -> Vec<AlarmRecord> {
        self.alarms
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }
}
