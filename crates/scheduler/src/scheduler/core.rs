//! [`AlarmScheduler`]: mutation entry points and the resolve → arm cycle.

use std::future::Future;
use std::sync::Arc;

use alarmd_core::format::format_day_and_time;
use alarmd_core::{
    AlarmError, AlarmFilter, AlarmId, AlarmPatch, AlarmRecord, Clock, Config, SystemClock, Zone,
};
use alarmd_store::{AlarmStore, SnoozeBackend};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::resolver::{NextAlarmDecision, NextAlarmResolver};
use crate::snooze::SnoozeRegistry;
use crate::traits::{NextAlarmSetting, StatusSurface, WakePayload, WakeTimer};

use super::events::{AppliedDecision, NextAlarmEvent};

const EVENT_CAPACITY: usize = 16;

/// Scheduling behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Zone alarm wall-clock times are interpreted in.
    pub zone: Zone,
    /// Whether the published next-alarm string uses a 24-hour clock.
    pub use_24_hour: bool,
    /// Default snooze length for [`AlarmScheduler::snooze_for`].
    pub snooze_minutes: u32,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Result<Self, AlarmError> {
        Ok(Self {
            zone: config.zone()?,
            use_24_hour: config.use_24_hour,
            snooze_minutes: config.snooze_minutes,
        })
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            use_24_hour: true,
            snooze_minutes: 10,
        }
    }
}

/// External collaborators the scheduler drives.
pub struct SchedulerParts {
    pub store: Arc<dyn AlarmStore>,
    pub snooze_backend: Arc<dyn SnoozeBackend>,
    pub timer: Arc<dyn WakeTimer>,
    pub status: Arc<dyn StatusSurface>,
    pub next_alarm: Arc<dyn NextAlarmSetting>,
}

/// Single owner of the "next alarm" decision.
///
/// Every public mutation durably applies its change, then calls
/// [`reconcile_and_arm`](AlarmScheduler::reconcile_and_arm). Reconciliations
/// are serialized so concurrent callers never arm the timer with a stale
/// decision.
///
/// A mutation error with [`AlarmError::is_applied`] set means the change was
/// saved and only a later step failed; the next reconciliation retries it.
pub struct AlarmScheduler {
    store: Arc<dyn AlarmStore>,
    snoozes: Arc<SnoozeRegistry>,
    resolver: NextAlarmResolver,
    timer: Arc<dyn WakeTimer>,
    status: Arc<dyn StatusSurface>,
    next_alarm: Arc<dyn NextAlarmSetting>,
    settings: SchedulerSettings,
    clock: Arc<dyn Clock>,
    applied: Mutex<Option<AppliedDecision>>,
    events: broadcast::Sender<NextAlarmEvent>,
}

impl AlarmScheduler {
    /// Build a scheduler, loading persisted snooze overrides.
    ///
    /// Nothing is armed until the first reconciliation; hosts call
    /// [`on_boot`](Self::on_boot) at startup.
    pub fn new(parts: SchedulerParts, settings: SchedulerSettings) -> Result<Self, AlarmError> {
        let snoozes = Arc::new(SnoozeRegistry::open(parts.snooze_backend, parts.status.clone())?);
        let resolver = NextAlarmResolver::new(parts.store.clone(), snoozes.clone(), settings.zone);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!(
            store = parts.store.backend_name(),
            timer = parts.timer.timer_name(),
            surface = parts.status.surface_name(),
            zone = %settings.zone,
            "alarm scheduler created"
        );

        Ok(Self {
            store: parts.store,
            snoozes,
            resolver,
            timer: parts.timer,
            status: parts.status,
            next_alarm: parts.next_alarm,
            settings,
            clock: Arc::new(SystemClock),
            applied: Mutex::new(None),
            events,
        })
    }

    /// Replace the clock used for "now".
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn snoozes(&self) -> &SnoozeRegistry {
        &self.snoozes
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Receive a [`NextAlarmEvent`] after every reconciliation.
    pub fn subscribe(&self) -> broadcast::Receiver<NextAlarmEvent> {
        self.events.subscribe()
    }

    /// The decision applied by the most recent reconciliation.
    pub async fn current_decision(&self) -> Option<AppliedDecision> {
        self.applied.lock().await.clone()
    }

    pub async fn get_alarm(&self, id: AlarmId) -> Result<AlarmRecord, AlarmError> {
        self.store.get(id).await?.ok_or(AlarmError::NotFound(id))
    }

    pub async fn list_alarms(&self, filter: AlarmFilter) -> Result<Vec<AlarmRecord>, AlarmError> {
        Ok(self.store.query(filter).await?)
    }

    // ── Mutations ───────────────────────────────────────────────────
    //
    // An error raised after a mutation's durable write is returned through
    // `AlarmError::committed`, so `is_applied()` tells callers the change
    // was kept. Errors before the write leave records and snoozes untouched.

    /// Store a new alarm. Returns its assigned id and its own next fire time.
    ///
    /// An enabled alarm clears every snooze override firing after it.
    pub async fn add_alarm(&self, mut record: AlarmRecord) -> Result<(AlarmId, DateTime<Utc>), AlarmError> {
        record.validate()?;
        let now = self.now();
        record.armed_from = Some(now);
        let fire_at = record.next_fire_time(now, self.settings.zone)?;

        let enabled = record.enabled;
        let id = self.store.insert(record).await?;
        info!(alarm_id = %id, fire_at = %fire_at, enabled, "Alarm added");

        if enabled {
            self.snoozes
                .clear_overrides_firing_after(fire_at)
                .await
                .map_err(AlarmError::committed)?;
        }
        self.reconcile_and_arm(now).await.map_err(AlarmError::committed)?;
        Ok((id, fire_at))
    }

    /// Overwrite the stored alarm with `record`. Returns its own next fire time.
    ///
    /// Editing always cancels the alarm's own snooze. When the edited alarm
    /// is enabled it is re-anchored at now and clears later overrides.
    pub async fn update_alarm(&self, mut record: AlarmRecord) -> Result<DateTime<Utc>, AlarmError> {
        record.validate()?;
        let id = record.id;
        if !id.is_valid() {
            return Err(AlarmError::NotFound(id));
        }

        let now = self.now();
        if record.enabled {
            record.armed_from = Some(now);
        }
        let fire_at = record.next_fire_time(now, self.settings.zone)?;

        let patch = AlarmPatch::from_record(&record);
        self.clearing_snooze(id, async {
            if self.store.update(id, &patch).await? == 0 {
                return Err(AlarmError::NotFound(id));
            }
            Ok::<_, AlarmError>(())
        })
        .await?;
        info!(alarm_id = %id, fire_at = %fire_at, enabled = record.enabled, "Alarm updated");

        if record.enabled {
            self.snoozes
                .clear_overrides_firing_after(fire_at)
                .await
                .map_err(AlarmError::committed)?;
        }
        self.reconcile_and_arm(now).await.map_err(AlarmError::committed)?;
        Ok(fire_at)
    }

    /// Delete an alarm and any snooze it holds.
    ///
    /// `AlarmId::INVALID` is a no-op. A missing id still reconciles before
    /// reporting `NotFound`.
    pub async fn delete_alarm(&self, id: AlarmId) -> Result<(), AlarmError> {
        if !id.is_valid() {
            return Ok(());
        }

        let now = self.now();
        let rows = self
            .clearing_snooze(id, async { Ok::<_, AlarmError>(self.store.delete(id).await?) })
            .await?;
        if rows == 0 {
            self.reconcile_and_arm(now).await?;
            return Err(AlarmError::NotFound(id));
        }

        info!(alarm_id = %id, "Alarm deleted");
        self.reconcile_and_arm(now).await.map_err(AlarmError::committed)?;
        Ok(())
    }

    /// Enable or disable an alarm.
    ///
    /// Enabling re-anchors the alarm at now and clears overrides firing after
    /// it. Disabling clears the alarm's own snooze.
    pub async fn set_enabled(&self, id: AlarmId, enabled: bool) -> Result<(), AlarmError> {
        let mut alarm = self.get_alarm(id).await?;
        let now = self.now();

        let patch = if enabled {
            AlarmPatch::enabled(true).with_armed_from(now)
        } else {
            AlarmPatch::enabled(false)
        };
        let write = async {
            if self.store.update(id, &patch).await? == 0 {
                return Err(AlarmError::NotFound(id));
            }
            Ok::<_, AlarmError>(())
        };
        if enabled {
            write.await?;
        } else {
            self.clearing_snooze(id, write).await?;
        }
        patch.apply(&mut alarm);
        info!(alarm_id = %id, enabled, "Alarm enabled state changed");

        if enabled {
            let fire_at = alarm
                .next_fire_time(now, self.settings.zone)
                .map_err(AlarmError::committed)?;
            self.snoozes
                .clear_overrides_firing_after(fire_at)
                .await
                .map_err(AlarmError::committed)?;
        }
        self.reconcile_and_arm(now).await.map_err(AlarmError::committed)?;
        Ok(())
    }

    /// Snooze `id` until `fire_at`, replacing any earlier snooze of it.
    ///
    /// `AlarmId::INVALID` clears every snooze. Other overrides are left
    /// alone even when `fire_at` is earlier than theirs.
    pub async fn snooze_alarm(&self, id: AlarmId, fire_at: DateTime<Utc>) -> Result<(), AlarmError> {
        if id.is_valid() && self.store.get(id).await?.is_none() {
            return Err(AlarmError::NotFound(id));
        }
        self.snoozes.snooze(id, fire_at).await?;
        self.reconcile_and_arm(self.now())
            .await
            .map_err(AlarmError::committed)?;
        Ok(())
    }

    /// Snooze `id` for `minutes` from now, or the configured default length.
    pub async fn snooze_for(&self, id: AlarmId, minutes: Option<u32>) -> Result<DateTime<Utc>, AlarmError> {
        let minutes = minutes.unwrap_or(self.settings.snooze_minutes);
        let fire_at = self.now() + Duration::minutes(i64::from(minutes));
        self.snooze_alarm(id, fire_at).await?;
        Ok(fire_at)
    }

    /// Cancel a pending snooze from its notification. Returns whether one
    /// was pending.
    pub async fn cancel_snooze(&self, id: AlarmId) -> Result<bool, AlarmError> {
        let removed = self.snoozes.clear_if_snoozed(id).await?;
        if removed {
            info!(alarm_id = %id, "Snooze cancelled");
        }
        self.reconcile_and_arm(self.now())
            .await
            .map_err(|e| if removed { e.committed() } else { e })?;
        Ok(removed)
    }

    /// User dismissed a ringing or snoozed alarm.
    ///
    /// Clears its snooze; an enabled one-shot alarm is disabled.
    pub async fn dismiss(&self, id: AlarmId) -> Result<(), AlarmError> {
        let alarm = self.get_alarm(id).await?;
        let now = self.now();

        let disable = alarm.enabled && !alarm.is_repeating();
        self.clearing_snooze(id, async {
            if disable {
                self.store.update(id, &AlarmPatch::enabled(false)).await?;
            }
            Ok::<_, AlarmError>(())
        })
        .await?;
        info!(alarm_id = %id, repeating = alarm.is_repeating(), "Alarm dismissed");
        self.reconcile_and_arm(now).await.map_err(AlarmError::committed)?;
        Ok(())
    }

    /// Disable enabled one-shot alarms whose occurrence has passed.
    ///
    /// Repeating alarms and snoozed alarms are skipped. Returns the ids
    /// disabled.
    pub async fn disable_expired_alarms(&self, now: DateTime<Utc>) -> Result<Vec<AlarmId>, AlarmError> {
        let mut disabled = Vec::new();
        for alarm in self.store.query(AlarmFilter::Enabled).await? {
            if alarm.is_repeating() || self.snoozes.is_snoozed(alarm.id) {
                continue;
            }
            let fire_at = match alarm.next_fire_time(now, self.settings.zone) {
                Ok(t) => t,
                Err(e) => {
                    warn!(alarm_id = %alarm.id, error = %e, "skipping alarm with unschedulable time");
                    continue;
                }
            };
            if fire_at < now {
                info!(alarm_id = %alarm.id, fire_at = %fire_at, "Disabling expired alarm");
                self.store.update(alarm.id, &AlarmPatch::enabled(false)).await?;
                disabled.push(alarm.id);
            }
        }
        Ok(disabled)
    }

    /// Clear `id`'s snooze, then run `write`. When `write` fails the snooze
    /// is put back, so the failed mutation leaves no partial change.
    async fn clearing_snooze<T>(
        &self,
        id: AlarmId,
        write: impl Future<Output = Result<T, AlarmError>>,
    ) -> Result<T, AlarmError> {
        let previous = self.snoozes.snooze_time_of(id);
        if previous.is_some() {
            self.snoozes.clear_if_snoozed(id).await?;
        }

        match write.await {
            Ok(out) => Ok(out),
            Err(e) => {
                if let Some(fire_at) = previous {
                    if let Err(restore) = self.snoozes.snooze(id, fire_at).await {
                        warn!(alarm_id = %id, error = %restore, "failed to restore snooze after a failed write");
                    }
                }
                Err(e)
            }
        }
    }

    // ── Boundary events ─────────────────────────────────────────────

    /// Device boot: drop expired one-shots, then re-arm.
    pub async fn on_boot(&self) -> Result<NextAlarmDecision, AlarmError> {
        let now = self.now();
        let disabled = self.disable_expired_alarms(now).await?;
        info!(expired = disabled.len(), "Boot reconciliation");
        self.reconcile_and_arm(now)
            .await
            .map_err(|e| if disabled.is_empty() { e } else { e.committed() })
    }

    /// Wall clock or timezone changed: re-arm.
    pub async fn on_time_changed(&self) -> Result<NextAlarmDecision, AlarmError> {
        info!("Time changed, reconciling");
        self.reconcile_and_arm(self.now()).await
    }

    // ── Reconciliation ──────────────────────────────────────────────

    /// Resolve the next alarm as of `now` without touching the wake timer
    /// or the surfaces. Expired alarms are still disabled.
    pub async fn resolve_next(&self, now: DateTime<Utc>) -> Result<NextAlarmDecision, AlarmError> {
        let _serialized = self.applied.lock().await;
        self.resolver.resolve(now).await
    }

    /// Resolve the next alarm as of `now` and apply it.
    ///
    /// With a decision: arm the wake timer, show the armed indicator, and
    /// publish the formatted time. Without one: cancel the timer, hide the
    /// indicator, and publish an empty string.
    ///
    /// A rejected arm cancels whatever wake is still pending, clears the
    /// surfaces, and returns [`AlarmError::TimerArm`]. A failed cancel also
    /// returns `TimerArm`. Either way the decision is recorded as not synced
    /// and the next reconciliation retries.
    pub async fn reconcile_and_arm(&self, now: DateTime<Utc>) -> Result<NextAlarmDecision, AlarmError> {
        let mut applied = self.applied.lock().await;
        let decision = self.resolver.resolve(now).await?;

        let mut outcome = Ok(());
        let mut formatted = String::new();
        match &decision {
            Some(next) => {
                let payload = WakePayload::from(next);
                match self.timer.arm_exact(next.fire_at, &payload).await {
                    Ok(()) => {
                        formatted =
                            format_day_and_time(next.fire_at, self.settings.zone, self.settings.use_24_hour);
                        info!(
                            alarm_id = %next.id(),
                            fire_at = %next.fire_at,
                            snoozed = next.snoozed,
                            timer = self.timer.timer_name(),
                            "Alarm armed"
                        );
                    }
                    Err(e) => {
                        warn!(
                            alarm_id = %next.id(),
                            fire_at = %next.fire_at,
                            timer = self.timer.timer_name(),
                            error = %e,
                            "Wake timer rejected arm request"
                        );
                        // The previous wake may belong to another alarm.
                        if let Err(cancel) = self.timer.cancel().await {
                            warn!(timer = self.timer.timer_name(), error = %cancel, "failed to cancel stale wake");
                        }
                        outcome = Err(AlarmError::from(e));
                    }
                }
            }
            None => match self.timer.cancel().await {
                Ok(()) => info!("No next alarm"),
                Err(e) => {
                    warn!(timer = self.timer.timer_name(), error = %e, "failed to cancel wake timer");
                    outcome = Err(AlarmError::TimerArm(format!("cancel failed: {}", e)));
                }
            },
        }

        let armed = !formatted.is_empty();
        self.set_status(armed).await;
        self.publish(&formatted).await;

        *applied = Some(AppliedDecision {
            decision: decision.clone(),
            armed,
            synced: outcome.is_ok(),
            at: now,
        });
        // No subscribers is fine.
        let _ = self.events.send(NextAlarmEvent {
            decision: decision.clone(),
            formatted,
            reconciled_at: now,
        });

        outcome.map(|()| decision)
    }

    async fn set_status(&self, armed: bool) {
        if let Err(e) = self.status.set_armed(armed).await {
            warn!(surface = self.status.surface_name(), armed, error = %e, "failed to update status surface");
        }
    }

    async fn publish(&self, formatted: &str) {
        if let Err(e) = self.next_alarm.publish(formatted).await {
            warn!(error = %e, "failed to publish next alarm string");
        }
    }
}
