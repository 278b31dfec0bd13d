//! Per-alarm snooze overrides.
//!
//! The registry owns the alarm id → snooze fire time map. Every change is
//! written through to a [`SnoozeBackend`] before it becomes visible, and any
//! override that is removed also has its notification cancelled. The registry
//! never arms or disarms the wake timer; re-resolution is the scheduler's job.

use std::sync::{Arc, Mutex};

use alarmd_core::{AlarmError, AlarmId};
use alarmd_store::{SnoozeBackend, SnoozeMap, StoreError};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::traits::StatusSurface;

pub struct SnoozeRegistry {
    backend: Arc<dyn SnoozeBackend>,
    status: Arc<dyn StatusSurface>,
    snoozes: Mutex<SnoozeMap>,
}

impl SnoozeRegistry {
    /// Load persisted overrides from `backend`.
    pub fn open(
        backend: Arc<dyn SnoozeBackend>,
        status: Arc<dyn StatusSurface>,
    ) -> Result<Self, StoreError> {
        let snoozes = backend.load()?;
        debug!(count = snoozes.len(), "snooze overrides loaded");
        Ok(Self {
            backend,
            status,
            snoozes: Mutex::new(snoozes),
        })
    }

    /// Set the override for `id` to `fire_at`, replacing any previous one.
    ///
    /// `AlarmId::INVALID` clears every override instead.
    pub async fn snooze(&self, id: AlarmId, fire_at: DateTime<Utc>) -> Result<(), AlarmError> {
        if !id.is_valid() {
            self.clear_all().await?;
            return Ok(());
        }
        self.commit(|map| {
            map.insert(id, fire_at);
            Vec::new()
        })?;
        info!(alarm_id = %id, fire_at = %fire_at, "Alarm snoozed");
        Ok(())
    }

    /// Remove the override for `id` if there is one. Returns whether it existed.
    pub async fn clear_if_snoozed(&self, id: AlarmId) -> Result<bool, AlarmError> {
        if !self.is_snoozed(id) {
            return Ok(false);
        }
        let removed = self.commit(|map| map.remove(&id).map(|_| id).into_iter().collect())?;
        self.cancel_notifications(&removed).await;
        Ok(!removed.is_empty())
    }

    /// Remove every override firing strictly after `threshold`.
    ///
    /// Overrides at or before `threshold` are left alone. Returns the ids
    /// whose overrides were removed.
    pub async fn clear_overrides_firing_after(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<AlarmId>, AlarmError> {
        let removed = self.commit(|map| {
            let later: Vec<AlarmId> = map
                .iter()
                .filter(|(_, fire_at)| **fire_at > threshold)
                .map(|(id, _)| *id)
                .collect();
            for id in &later {
                map.remove(id);
            }
            later
        })?;
        if !removed.is_empty() {
            info!(
                threshold = %threshold,
                cleared = ?removed,
                "Cleared snoozes firing after an earlier alarm"
            );
        }
        self.cancel_notifications(&removed).await;
        Ok(removed)
    }

    /// Remove every override. Returns the ids that were snoozed.
    pub async fn clear_all(&self) -> Result<Vec<AlarmId>, AlarmError> {
        let removed = self.commit(|map| {
            let all: Vec<AlarmId> = map.keys().copied().collect();
            map.clear();
            all
        })?;
        self.cancel_notifications(&removed).await;
        Ok(removed)
    }

    pub fn is_snoozed(&self, id: AlarmId) -> bool {
        self.lock_read().contains_key(&id)
    }

    pub fn snooze_time_of(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.lock_read().get(&id).copied()
    }

    /// Copy of all current overrides.
    pub fn snapshot(&self) -> SnoozeMap {
        self.lock_read().clone()
    }

    fn lock_read(&self) -> std::sync::MutexGuard<'_, SnoozeMap> {
        self.snoozes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `change` to a copy of the map, persist it if it differs, then
    /// swap it in. Returns whatever `change` reports as removed.
    fn commit(
        &self,
        change: impl FnOnce(&mut SnoozeMap) -> Vec<AlarmId>,
    ) -> Result<Vec<AlarmId>, AlarmError> {
        let mut current = self.snoozes.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = current.clone();
        let removed = change(&mut next);
        if next != *current {
            self.backend.save(&next)?;
            *current = next;
        }
        Ok(removed)
    }

    async fn cancel_notifications(&self, ids: &[AlarmId]) {
        for id in ids {
            if let Err(e) = self.status.cancel_notification(*id).await {
                warn!(
                    alarm_id = %id,
                    surface = self.status.surface_name(),
                    error = %e,
                    "failed to cancel snooze notification"
                );
            }
        }
    }
}
