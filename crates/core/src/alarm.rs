//! Alarm records, partial updates, and store query predicates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::days::DaysOfWeek;
use crate::error::AlarmError;
use crate::time::{next_occurrence, Zone};

// ── AlarmId ─────────────────────────────────────────────────────────

/// Store-assigned alarm identity. Stable and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub i64);

impl AlarmId {
    /// Sentinel for "no alarm".
    pub const INVALID: AlarmId = AlarmId(-1);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AlarmId {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(AlarmId)
            .map_err(|_| AlarmError::InvalidInput(format!("invalid alarm id '{}'", s)))
    }
}

// ── AlarmRecord ─────────────────────────────────────────────────────

/// A persisted alarm definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    /// Assigned by the store on insert; `AlarmId::INVALID` until then.
    pub id: AlarmId,
    pub enabled: bool,
    /// Empty set means a one-shot alarm.
    #[serde(default)]
    pub days: DaysOfWeek,
    pub hour: u32,
    pub minute: u32,
    /// Instant a one-shot alarm's single occurrence is computed from.
    ///
    /// Refreshed whenever the alarm is created, edited while enabled, or
    /// enabled. Repeating alarms ignore it.
    #[serde(default)]
    pub armed_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: bool,
    #[serde(default)]
    pub sound: Option<String>,
}

fn default_vibrate() -> bool {
    true
}

impl AlarmRecord {
    /// An enabled one-shot alarm at `hour:minute`, not yet stored.
    pub fn new(hour: u32, minute: u32) -> Result<Self, AlarmError> {
        validate_time(hour, minute)?;
        Ok(Self {
            id: AlarmId::INVALID,
            enabled: true,
            days: DaysOfWeek::empty(),
            hour,
            minute,
            armed_from: None,
            label: String::new(),
            vibrate: default_vibrate(),
            sound: None,
        })
    }

    pub fn with_days(mut self, days: DaysOfWeek) -> Self {
        self.days = days;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_repeating(&self) -> bool {
        self.days.is_repeating()
    }

    pub fn validate(&self) -> Result<(), AlarmError> {
        validate_time(self.hour, self.minute)
    }

    /// The next time this alarm's own schedule fires, ignoring snoozes.
    ///
    /// Repeating alarms are computed from `now` and never land in the past.
    /// One-shot alarms are computed from `armed_from` (or `now` when unset),
    /// so a one-shot whose occurrence has passed yields a time before `now`.
    pub fn next_fire_time(&self, now: DateTime<Utc>, zone: Zone) -> Result<DateTime<Utc>, AlarmError> {
        let reference = if self.is_repeating() {
            now
        } else {
            self.armed_from.unwrap_or(now)
        };
        next_occurrence(self.hour, self.minute, self.days, reference, zone)
    }
}

pub(crate) fn validate_time(hour: u32, minute: u32) -> Result<(), AlarmError> {
    if hour >= 24 || minute >= 60 {
        return Err(AlarmError::InvalidTime { hour, minute });
    }
    Ok(())
}

/// Parse `HH:MM` (24-hour) into an hour/minute pair.
pub fn parse_hh_mm(s: &str) -> Result<(u32, u32), AlarmError> {
    let invalid = || AlarmError::InvalidInput(format!("expected HH:MM, got '{}'", s));
    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    validate_time(hour, minute)?;
    Ok((hour, minute))
}

// ── AlarmPatch ──────────────────────────────────────────────────────

/// Partial field set for `AlarmStore::update`. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmPatch {
    pub enabled: Option<bool>,
    pub days: Option<DaysOfWeek>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub armed_from: Option<Option<DateTime<Utc>>>,
    pub label: Option<String>,
    pub vibrate: Option<bool>,
    pub sound: Option<Option<String>>,
}

impl AlarmPatch {
    /// A patch that overwrites every mutable field with `record`'s values.
    pub fn from_record(record: &AlarmRecord) -> Self {
        Self {
            enabled: Some(record.enabled),
            days: Some(record.days),
            hour: Some(record.hour),
            minute: Some(record.minute),
            armed_from: Some(record.armed_from),
            label: Some(record.label.clone()),
            vibrate: Some(record.vibrate),
            sound: Some(record.sound.clone()),
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn with_armed_from(mut self, at: DateTime<Utc>) -> Self {
        self.armed_from = Some(Some(at));
        self
    }

    /// Check field ranges before the patch reaches a store.
    pub fn validate(&self, current: &AlarmRecord) -> Result<(), AlarmError> {
        validate_time(
            self.hour.unwrap_or(current.hour),
            self.minute.unwrap_or(current.minute),
        )
    }

    /// Apply the patch in place. The id is never touched.
    pub fn apply(&self, record: &mut AlarmRecord) {
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
        if let Some(days) = self.days {
            record.days = days;
        }
        if let Some(hour) = self.hour {
            record.hour = hour;
        }
        if let Some(minute) = self.minute {
            record.minute = minute;
        }
        if let Some(armed_from) = self.armed_from {
            record.armed_from = armed_from;
        }
        if let Some(label) = &self.label {
            record.label = label.clone();
        }
        if let Some(vibrate) = self.vibrate {
            record.vibrate = vibrate;
        }
        if let Some(sound) = &self.sound {
            record.sound = sound.clone();
        }
    }
}

// ── AlarmFilter ─────────────────────────────────────────────────────

/// Query predicate for `AlarmStore::query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmFilter {
    All,
    Enabled,
    Disabled,
}

impl AlarmFilter {
    pub fn matches(&self, record: &AlarmRecord) -> bool {
        match self {
            AlarmFilter::All => true,
            AlarmFilter::Enabled => record.enabled,
            AlarmFilter::Disabled => !record.enabled,
        }
    }
}
