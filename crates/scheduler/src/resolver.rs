//! Next-alarm resolution.
//!
//! Merges stored alarms with snooze overrides and picks the single alarm that
//! fires soonest. Resolution is recomputed from scratch every time; the only
//! side effect is disabling expired alarms.

use std::collections::BTreeMap;
use std::sync::Arc;

use alarmd_core::{AlarmError, AlarmFilter, AlarmId, AlarmPatch, AlarmRecord, Zone};
use alarmd_store::AlarmStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::snooze::SnoozeRegistry;

/// The alarm that fires next and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAlarm {
    pub alarm: AlarmRecord,
    pub fire_at: DateTime<Utc>,
    /// Whether `fire_at` comes from a snooze override.
    pub snoozed: bool,
}

impl NextAlarm {
    pub fn id(&self) -> AlarmId {
        self.alarm.id
    }
}

/// `None` means nothing is scheduled.
pub type NextAlarmDecision = Option<NextAlarm>;

pub struct NextAlarmResolver {
    store: Arc<dyn AlarmStore>,
    snoozes: Arc<SnoozeRegistry>,
    zone: Zone,
}

impl NextAlarmResolver {
    pub fn new(store: Arc<dyn AlarmStore>, snoozes: Arc<SnoozeRegistry>, zone: Zone) -> Self {
        Self {
            store,
            snoozes,
            zone,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Compute the next alarm to fire as of `now`.
    ///
    /// Candidates are every enabled alarm plus every alarm holding a snooze
    /// override, keyed by id. A candidate whose effective fire time is before
    /// `now` is expired: it is disabled, its override is dropped, and it is
    /// left out. On equal fire times the lower id wins.
    pub async fn resolve(&self, now: DateTime<Utc>) -> Result<NextAlarmDecision, AlarmError> {
        let overrides = self.snoozes.snapshot();
        let candidates = self.candidates(&overrides).await?;

        let mut best: Option<NextAlarm> = None;
        for (id, alarm) in candidates {
            let (fire_at, snoozed) = match overrides.get(&id) {
                Some(at) => (*at, true),
                None => match alarm.next_fire_time(now, self.zone) {
                    Ok(at) => (at, false),
                    Err(e) => {
                        warn!(alarm_id = %id, error = %e, "skipping alarm with unschedulable time");
                        continue;
                    }
                },
            };

            if fire_at < now {
                self.expire(&alarm, fire_at, snoozed).await;
                continue;
            }

            if best.as_ref().map_or(true, |b| fire_at < b.fire_at) {
                best = Some(NextAlarm {
                    alarm,
                    fire_at,
                    snoozed,
                });
            }
        }

        match &best {
            Some(next) => debug!(alarm_id = %next.id(), fire_at = %next.fire_at, snoozed = next.snoozed, "resolved next alarm"),
            None => debug!("resolved no next alarm"),
        }
        Ok(best)
    }

    async fn candidates(
        &self,
        overrides: &BTreeMap<AlarmId, DateTime<Utc>>,
    ) -> Result<BTreeMap<AlarmId, AlarmRecord>, AlarmError> {
        let mut candidates = BTreeMap::new();

        for id in overrides.keys() {
            match self.store.get(*id).await? {
                Some(alarm) => {
                    candidates.insert(*id, alarm);
                }
                None => warn!(alarm_id = %id, "snooze override references a missing alarm, ignoring"),
            }
        }

        for alarm in self.store.query(AlarmFilter::Enabled).await? {
            candidates.entry(alarm.id).or_insert(alarm);
        }

        Ok(candidates)
    }

    /// Housekeeping for an alarm whose time has passed. Never fails.
    async fn expire(&self, alarm: &AlarmRecord, fire_at: DateTime<Utc>, snoozed: bool) {
        info!(
            alarm_id = %alarm.id,
            fire_at = %fire_at,
            snoozed,
            "Disabling expired alarm"
        );

        if let Err(e) = self.snoozes.clear_if_snoozed(alarm.id).await {
            warn!(alarm_id = %alarm.id, error = %e, "failed to clear snooze of expired alarm");
        }

        if alarm.enabled {
            if let Err(e) = self.store.update(alarm.id, &AlarmPatch::enabled(false)).await {
                warn!(alarm_id = %alarm.id, error = %e, "failed to disable expired alarm");
            }
        }
    }
}
