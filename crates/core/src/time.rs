//! Wall-clock helpers: timezone handling, clocks, and next-occurrence math.

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc,
};

use crate::days::DaysOfWeek;
use crate::error::AlarmError;

// ── Zone ────────────────────────────────────────────────────────────

/// Timezone alarm wall-clock times are interpreted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Zone {
    /// The host timezone, DST aware.
    #[default]
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    /// Convert an instant to local wall-clock time in this zone.
    pub fn naive_local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Local => at.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => at.with_timezone(offset).naive_local(),
        }
    }

    /// Convert a local wall-clock time to an instant.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earliest instant.
    /// Nonexistent times (DST spring-forward gap) are shifted one hour later.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.resolve(local)
            .or_else(|| self.resolve(local + Duration::hours(1)))
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Zone::Local => Local
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Zone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// Parses `local`, `utc`, or an offset such as `+02:00`.
impl FromStr for Zone {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "local" => Ok(Zone::Local),
            "utc" | "z" => Ok(Zone::utc()),
            _ => s
                .parse::<FixedOffset>()
                .map(Zone::Fixed)
                .map_err(|e| AlarmError::Config(format!("invalid zone '{}': {}", s, e))),
        }
    }
}

// ── Clock ───────────────────────────────────────────────────────────

/// Source of "now" for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Useful for testing and deterministic replay.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Next occurrence ─────────────────────────────────────────────────

/// Compute the next time `hour:minute` occurs after `after`.
///
/// Works at minute granularity: if `hour:minute` is at or before the local
/// `hour:minute` of `after`, the candidate moves to the following day. For a
/// repeating `days` set the candidate then advances to the next set weekday,
/// so a repeating result is always strictly after `after`. An empty set is a
/// one-shot and only the day roll applies.
pub fn next_occurrence(
    hour: u32,
    minute: u32,
    days: DaysOfWeek,
    after: DateTime<Utc>,
    zone: Zone,
) -> Result<DateTime<Utc>, AlarmError> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or(AlarmError::InvalidTime { hour, minute })?;

    let local = zone.naive_local(after);
    let mut date = local.date();
    if (hour, minute) <= (local.hour(), local.minute()) {
        date = date.succ_opt().ok_or_else(out_of_range)?;
    }

    let skip = days.days_until_next(date.weekday());
    if skip > 0 {
        date = date
            .checked_add_days(chrono::Days::new(u64::from(skip)))
            .ok_or_else(out_of_range)?;
    }

    zone.to_utc(date.and_time(time)).ok_or_else(out_of_range)
}

fn out_of_range() -> AlarmError {
    AlarmError::InvalidInput("alarm time out of representable range".to_string())
}
