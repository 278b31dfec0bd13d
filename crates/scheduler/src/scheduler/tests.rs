//! Tests for the scheduler module.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alarmd_core::{AlarmError, AlarmFilter, AlarmId, AlarmRecord, DaysOfWeek, ManualClock, Zone};
    use alarmd_store::{AlarmStore, MemoryAlarmStore, MemorySnoozeBackend};
    use chrono::{DateTime, Duration, Utc};

    use crate::memory::{MemoryNextAlarmSetting, RecordingStatusSurface, RecordingWakeTimer, TimerCall};
    use crate::scheduler::{AlarmScheduler, SchedulerParts, SchedulerSettings};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    /// Monday noon, UTC.
    fn start() -> DateTime<Utc> {
        at("2026-10-19T12:00:00Z")
    }

    struct Harness {
        scheduler: AlarmScheduler,
        store: Arc<MemoryAlarmStore>,
        timer: Arc<RecordingWakeTimer>,
        status: Arc<RecordingStatusSurface>,
        next_alarm: Arc<MemoryNextAlarmSetting>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryAlarmStore::new());
        let timer = Arc::new(RecordingWakeTimer::new());
        let status = Arc::new(RecordingStatusSurface::new());
        let next_alarm = Arc::new(MemoryNextAlarmSetting::new());
        let clock = Arc::new(ManualClock::new(start()));

        let parts = SchedulerParts {
            store: store.clone(),
            snooze_backend: Arc::new(MemorySnoozeBackend::new()),
            timer: timer.clone(),
            status: status.clone(),
            next_alarm: next_alarm.clone(),
        };
        let settings = SchedulerSettings {
            zone: Zone::utc(),
            use_24_hour: true,
            snooze_minutes: 10,
        };
        let scheduler = AlarmScheduler::new(parts, settings)
            .unwrap()
            .with_clock(clock.clone());

        Harness {
            scheduler,
            store,
            timer,
            status,
            next_alarm,
            clock,
        }
    }

    // -- add / update ------------------------------------------------------

    #[tokio::test]
    async fn add_arms_and_publishes() {
        let h = harness();
        let (id, fire_at) = h
            .scheduler
            .add_alarm(AlarmRecord::new(13, 0).unwrap().with_label("lunch"))
            .await
            .unwrap();

        assert_eq!(fire_at, at("2026-10-19T13:00:00Z"));
        let (armed_at, payload) = h.timer.pending().unwrap();
        assert_eq!(armed_at, fire_at);
        assert_eq!(payload.alarm_id(), id);
        assert_eq!(payload.alarm.label, "lunch");
        assert!(!payload.snoozed);
        assert_eq!(h.status.armed(), Some(true));
        assert_eq!(h.next_alarm.value(), "Mon 13:00");

        let stored = h.store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.armed_from, Some(start()));
    }

    #[tokio::test]
    async fn add_disabled_alarm_leaves_nothing_armed() {
        let h = harness();
        h.scheduler
            .add_alarm(AlarmRecord::new(13, 0).unwrap().disabled())
            .await
            .unwrap();

        assert_eq!(h.timer.calls(), vec![TimerCall::Cancel]);
        assert_eq!(h.status.armed(), Some(false));
        assert_eq!(h.next_alarm.value(), "");
    }

    #[tokio::test]
    async fn add_rejects_invalid_time() {
        let h = harness();
        let mut alarm = AlarmRecord::new(7, 0).unwrap();
        alarm.minute = 75;
        let err = h.scheduler.add_alarm(alarm).await.unwrap_err();
        assert!(matches!(err, AlarmError::InvalidTime { hour: 7, minute: 75 }));
        assert!(h.store.query(AlarmFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_unknown_alarm_is_not_found() {
        let h = harness();
        let mut alarm = AlarmRecord::new(7, 0).unwrap();
        alarm.id = AlarmId(99);
        let err = h.scheduler.update_alarm(alarm).await.unwrap_err();
        assert!(matches!(err, AlarmError::NotFound(AlarmId(99))));
    }

    #[tokio::test]
    async fn update_cancels_own_snooze() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(18, 0).unwrap())
            .await
            .unwrap();
        h.scheduler
            .snooze_alarm(id, at("2026-10-19T12:30:00Z"))
            .await
            .unwrap();

        let mut edited = h.scheduler.get_alarm(id).await.unwrap();
        edited.hour = 19;
        let fire_at = h.scheduler.update_alarm(edited).await.unwrap();

        assert_eq!(fire_at, at("2026-10-19T19:00:00Z"));
        assert!(!h.scheduler.snoozes().is_snoozed(id));
        assert_eq!(h.status.cancelled(), vec![id]);
        assert_eq!(h.timer.pending().unwrap().0, fire_at);
    }

    // -- delete ------------------------------------------------------------

    #[tokio::test]
    async fn delete_invalid_id_is_noop() {
        let h = harness();
        h.scheduler.delete_alarm(AlarmId::INVALID).await.unwrap();
        assert!(h.timer.calls().is_empty());
        assert!(h.scheduler.current_decision().await.is_none());
    }

    #[tokio::test]
    async fn delete_missing_id_reconciles_then_reports() {
        let h = harness();
        let err = h.scheduler.delete_alarm(AlarmId(5)).await.unwrap_err();
        assert!(matches!(err, AlarmError::NotFound(AlarmId(5))));
        assert!(h.scheduler.current_decision().await.is_some());
    }

    #[tokio::test]
    async fn delete_purges_snooze() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(18, 0).unwrap())
            .await
            .unwrap();
        h.scheduler
            .snooze_alarm(id, at("2026-10-19T12:30:00Z"))
            .await
            .unwrap();

        h.scheduler.delete_alarm(id).await.unwrap();

        assert!(!h.scheduler.snoozes().is_snoozed(id));
        assert_eq!(h.timer.calls().last(), Some(&TimerCall::Cancel));
        assert_eq!(h.next_alarm.value(), "");
    }

    // -- enable / disable --------------------------------------------------

    #[tokio::test]
    async fn disable_clears_snooze_and_disarms() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(18, 0).unwrap())
            .await
            .unwrap();
        h.scheduler
            .snooze_alarm(id, at("2026-10-19T12:30:00Z"))
            .await
            .unwrap();

        h.scheduler.set_enabled(id, false).await.unwrap();

        assert!(!h.scheduler.get_alarm(id).await.unwrap().enabled);
        assert!(!h.scheduler.snoozes().is_snoozed(id));
        assert_eq!(h.status.armed(), Some(false));
    }

    #[tokio::test]
    async fn enable_reanchors_one_shot() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(12, 30).unwrap().disabled())
            .await
            .unwrap();

        // A day later the stale anchor would make the alarm expire.
        h.clock.advance(Duration::days(1));
        h.scheduler.set_enabled(id, true).await.unwrap();

        let alarm = h.scheduler.get_alarm(id).await.unwrap();
        assert_eq!(alarm.armed_from, Some(at("2026-10-20T12:00:00Z")));
        assert_eq!(h.timer.pending().unwrap().0, at("2026-10-20T12:30:00Z"));
    }

    #[tokio::test]
    async fn set_enabled_unknown_id_is_not_found() {
        let h = harness();
        let err = h.scheduler.set_enabled(AlarmId(3), true).await.unwrap_err();
        assert!(matches!(err, AlarmError::NotFound(AlarmId(3))));
    }

    // -- snooze ------------------------------------------------------------

    #[tokio::test]
    async fn snooze_unknown_id_is_not_found() {
        let h = harness();
        let err = h
            .scheduler
            .snooze_alarm(AlarmId(8), at("2026-10-19T12:10:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AlarmError::NotFound(AlarmId(8))));
        assert!(h.scheduler.snoozes().snapshot().is_empty());
    }

    #[tokio::test]
    async fn snooze_for_uses_default_length() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(18, 0).unwrap())
            .await
            .unwrap();

        let fire_at = h.scheduler.snooze_for(id, None).await.unwrap();
        assert_eq!(fire_at, at("2026-10-19T12:10:00Z"));

        let (armed_at, payload) = h.timer.pending().unwrap();
        assert_eq!(armed_at, fire_at);
        assert!(payload.snoozed);
        assert_eq!(h.next_alarm.value(), "Mon 12:10");

        let fire_at = h.scheduler.snooze_for(id, Some(3)).await.unwrap();
        assert_eq!(fire_at, at("2026-10-19T12:03:00Z"));
        assert_eq!(h.scheduler.snoozes().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn snooze_invalid_id_clears_all() {
        let h = harness();
        let (a, _) = h.scheduler.add_alarm(AlarmRecord::new(18, 0).unwrap()).await.unwrap();
        let (b, _) = h.scheduler.add_alarm(AlarmRecord::new(19, 0).unwrap()).await.unwrap();
        h.scheduler.snooze_for(a, Some(5)).await.unwrap();
        h.scheduler.snooze_for(b, Some(5)).await.unwrap();

        h.scheduler
            .snooze_alarm(AlarmId::INVALID, start())
            .await
            .unwrap();

        assert!(h.scheduler.snoozes().snapshot().is_empty());
        assert_eq!(h.timer.pending().unwrap().0, at("2026-10-19T18:00:00Z"));
    }

    #[tokio::test]
    async fn cancel_snooze_reports_whether_pending() {
        let h = harness();
        let (id, _) = h.scheduler.add_alarm(AlarmRecord::new(18, 0).unwrap()).await.unwrap();
        assert!(!h.scheduler.cancel_snooze(id).await.unwrap());

        h.scheduler.snooze_for(id, None).await.unwrap();
        assert!(h.scheduler.cancel_snooze(id).await.unwrap());
        assert_eq!(h.timer.pending().unwrap().0, at("2026-10-19T18:00:00Z"));
    }

    // -- dismiss / expiry --------------------------------------------------

    #[tokio::test]
    async fn dismiss_disables_one_shot_but_not_repeating() {
        let h = harness();
        let (once, _) = h.scheduler.add_alarm(AlarmRecord::new(18, 0).unwrap()).await.unwrap();
        let (daily, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(19, 0).unwrap().with_days(DaysOfWeek::every_day()))
            .await
            .unwrap();
        h.scheduler.snooze_for(daily, None).await.unwrap();

        h.scheduler.dismiss(once).await.unwrap();
        h.scheduler.dismiss(daily).await.unwrap();

        assert!(!h.scheduler.get_alarm(once).await.unwrap().enabled);
        assert!(h.scheduler.get_alarm(daily).await.unwrap().enabled);
        assert!(!h.scheduler.snoozes().is_snoozed(daily));
        assert_eq!(h.timer.pending().unwrap().0, at("2026-10-19T19:00:00Z"));
    }

    #[tokio::test]
    async fn boot_disables_expired_one_shots() {
        let h = harness();
        let (once, _) = h.scheduler.add_alarm(AlarmRecord::new(12, 5).unwrap()).await.unwrap();
        let (daily, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(12, 5).unwrap().with_days(DaysOfWeek::every_day()))
            .await
            .unwrap();

        h.clock.advance(Duration::hours(1));
        let decision = h.scheduler.on_boot().await.unwrap().unwrap();

        assert!(!h.scheduler.get_alarm(once).await.unwrap().enabled);
        assert_eq!(decision.id(), daily);
        assert_eq!(decision.fire_at, at("2026-10-20T12:05:00Z"));
    }

    #[tokio::test]
    async fn disable_expired_skips_snoozed() {
        let h = harness();
        let (id, _) = h.scheduler.add_alarm(AlarmRecord::new(12, 5).unwrap()).await.unwrap();
        h.scheduler
            .snooze_alarm(id, at("2026-10-19T14:00:00Z"))
            .await
            .unwrap();

        h.clock.advance(Duration::hours(1));
        let now = h.scheduler.now();
        assert!(h.scheduler.disable_expired_alarms(now).await.unwrap().is_empty());
        assert!(h.scheduler.get_alarm(id).await.unwrap().enabled);
    }

    // -- reconciliation ----------------------------------------------------

    #[tokio::test]
    async fn timer_rejection_is_applied_and_retried() {
        let h = harness();
        h.timer.set_rejecting(Some("exact alarms not permitted"));

        let err = h
            .scheduler
            .add_alarm(AlarmRecord::new(13, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AlarmError::TimerArm(_)));
        assert!(err.is_applied());

        // The record was stored regardless.
        assert_eq!(h.store.query(AlarmFilter::All).await.unwrap().len(), 1);
        let applied = h.scheduler.current_decision().await.unwrap();
        assert!(!applied.armed);
        assert!(!applied.synced);
        assert!(applied.decision.is_some());
        assert_eq!(h.status.armed(), Some(false));

        h.timer.set_rejecting(None);
        let decision = h.scheduler.on_time_changed().await.unwrap().unwrap();
        assert_eq!(h.timer.pending().unwrap().0, decision.fire_at);
        let applied = h.scheduler.current_decision().await.unwrap();
        assert!(applied.armed && applied.synced);
    }

    #[tokio::test]
    async fn rejected_arm_cancels_stale_wake() {
        let h = harness();
        h.scheduler.add_alarm(AlarmRecord::new(13, 0).unwrap()).await.unwrap();
        assert_eq!(h.timer.pending().unwrap().0, at("2026-10-19T13:00:00Z"));

        h.timer.set_rejecting(Some("exact alarms not permitted"));
        let err = h
            .scheduler
            .add_alarm(AlarmRecord::new(12, 30).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AlarmError::TimerArm(_)));

        // The 13:00 wake must not survive as if it were the next alarm.
        assert!(h.timer.pending().is_none());
        assert_eq!(h.timer.calls().last(), Some(&TimerCall::Cancel));
        let applied = h.scheduler.current_decision().await.unwrap();
        assert_eq!(applied.decision.unwrap().fire_at, at("2026-10-19T12:30:00Z"));
        assert!(!applied.synced);
        assert_eq!(h.next_alarm.value(), "");
    }

    #[tokio::test]
    async fn failed_cancel_is_reported_and_retried() {
        let h = harness();
        let (id, _) = h
            .scheduler
            .add_alarm(AlarmRecord::new(13, 0).unwrap())
            .await
            .unwrap();

        h.timer.set_cancel_rejecting(Some("timer service gone"));
        let err = h.scheduler.delete_alarm(id).await.unwrap_err();
        assert!(matches!(err, AlarmError::TimerArm(_)));
        assert!(err.is_applied());
        assert!(h.store.get(id).await.unwrap().is_none());

        let applied = h.scheduler.current_decision().await.unwrap();
        assert!(applied.decision.is_none());
        assert!(!applied.synced);

        h.timer.set_cancel_rejecting(None);
        assert!(h.scheduler.on_time_changed().await.unwrap().is_none());
        assert!(h.timer.pending().is_none());
        assert!(h.scheduler.current_decision().await.unwrap().synced);
    }

    #[tokio::test]
    async fn every_reconciliation_is_broadcast() {
        let h = harness();
        let mut events = h.scheduler.subscribe();

        h.scheduler.add_alarm(AlarmRecord::new(13, 0).unwrap()).await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.formatted, "Mon 13:00");
        assert_eq!(event.reconciled_at, start());

        h.scheduler.on_time_changed().await.unwrap();
        let again = events.recv().await.unwrap();
        assert_eq!(again.decision, event.decision);
    }

    #[tokio::test]
    async fn twelve_hour_publication() {
        let store = Arc::new(MemoryAlarmStore::new());
        let next_alarm = Arc::new(MemoryNextAlarmSetting::new());
        let parts = SchedulerParts {
            store,
            snooze_backend: Arc::new(MemorySnoozeBackend::new()),
            timer: Arc::new(RecordingWakeTimer::new()),
            status: Arc::new(RecordingStatusSurface::new()),
            next_alarm: next_alarm.clone(),
        };
        let settings = SchedulerSettings {
            zone: Zone::utc(),
            use_24_hour: false,
            snooze_minutes: 10,
        };
        let scheduler = AlarmScheduler::new(parts, settings)
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(start())));

        scheduler.add_alarm(AlarmRecord::new(19, 5).unwrap()).await.unwrap();
        assert_eq!(next_alarm.value(), "Mon 7:05 PM");
    }
}
