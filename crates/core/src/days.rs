//! Weekday recurrence set for alarms.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays an alarm repeats on.
///
/// Stored as a bit set (Monday = bit 0 … Sunday = bit 6) and serialized as a
/// list of weekday names. The empty set means a one-shot alarm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Weekday>", from = "Vec<Weekday>")]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn every_day() -> Self {
        Self(0b111_1111)
    }

    /// Monday through Friday.
    pub const fn weekdays() -> Self {
        Self(0b001_1111)
    }

    pub const fn weekends() -> Self {
        Self(0b110_0000)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    /// A non-empty set repeats; an empty set fires once.
    pub fn is_repeating(&self) -> bool {
        self.0 != 0
    }

    /// Iterate the set days, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_DAYS.iter().copied().filter(|d| self.contains(*d))
    }

    /// Days to add to `from` to land on the next set day.
    ///
    /// Returns 0 when `from` itself is set, and 0 for an empty set.
    pub fn days_until_next(&self, from: Weekday) -> u32 {
        if !self.is_repeating() {
            return 0;
        }
        let mut day = from;
        for offset in 0..7 {
            if self.contains(day) {
                return offset;
            }
            day = day.succ();
        }
        0
    }
}

impl FromIterator<Weekday> for DaysOfWeek {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut days = Self::empty();
        for day in iter {
            days.insert(day);
        }
        days
    }
}

impl From<Vec<Weekday>> for DaysOfWeek {
    fn from(days: Vec<Weekday>) -> Self {
        days.into_iter().collect()
    }
}

impl From<DaysOfWeek> for Vec<Weekday> {
    fn from(days: DaysOfWeek) -> Self {
        days.iter().collect()
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::empty() {
            return f.write_str("never");
        }
        if *self == Self::every_day() {
            return f.write_str("every day");
        }
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Parses `daily`, `weekdays`, `weekends`, `never`, or a comma list such as
/// `mon,wed,fri`.
impl FromStr for DaysOfWeek {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "" | "never" | "once" => return Ok(Self::empty()),
            "daily" | "every day" => return Ok(Self::every_day()),
            "weekdays" => return Ok(Self::weekdays()),
            "weekends" => return Ok(Self::weekends()),
            _ => {}
        }

        s.split(',')
            .map(|part| {
                part.trim()
                    .parse::<Weekday>()
                    .map_err(|_| AlarmError::InvalidInput(format!("unknown weekday '{}'", part.trim())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_one_shot() {
        let days = DaysOfWeek::empty();
        assert!(!days.is_repeating());
        assert_eq!(days.days_until_next(Weekday::Wed), 0);
        assert_eq!(days.to_string(), "never");
    }

    #[test]
    fn days_until_next_wraps_around_week() {
        let days: DaysOfWeek = [Weekday::Mon].into_iter().collect();
        assert_eq!(days.days_until_next(Weekday::Mon), 0);
        assert_eq!(days.days_until_next(Weekday::Tue), 6);
        assert_eq!(days.days_until_next(Weekday::Sun), 1);
    }

    #[test]
    fn weekdays_skip_weekend() {
        let days = DaysOfWeek::weekdays();
        assert_eq!(days.days_until_next(Weekday::Sat), 2);
        assert_eq!(days.days_until_next(Weekday::Fri), 0);
        assert!(!days.contains(Weekday::Sun));
    }

    #[test]
    fn insert_and_remove() {
        let mut days = DaysOfWeek::empty();
        days.insert(Weekday::Thu);
        assert!(days.contains(Weekday::Thu));
        days.remove(Weekday::Thu);
        assert!(!days.is_repeating());
    }

    #[test]
    fn parse_keywords_and_lists() {
        assert_eq!("daily".parse::<DaysOfWeek>().unwrap(), DaysOfWeek::every_day());
        assert_eq!("Weekends".parse::<DaysOfWeek>().unwrap(), DaysOfWeek::weekends());
        assert_eq!("never".parse::<DaysOfWeek>().unwrap(), DaysOfWeek::empty());

        let parsed: DaysOfWeek = "mon, wed,fri".parse().unwrap();
        assert_eq!(
            parsed.iter().collect::<Vec<_>>(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn parse_rejects_unknown_day() {
        assert!("mon,funday".parse::<DaysOfWeek>().is_err());
    }

    #[test]
    fn display_lists_short_names() {
        let days: DaysOfWeek = "sat,sun".parse().unwrap();
        assert_eq!(days.to_string(), "Sat, Sun");
        assert_eq!(DaysOfWeek::every_day().to_string(), "every day");
    }

    #[test]
    fn serializes_as_weekday_list() {
        let days: DaysOfWeek = "tue,thu".parse().unwrap();
        let json = serde_json::to_string(&days).unwrap();
        assert_eq!(json, r#"["Tue","Thu"]"#);
        let back: DaysOfWeek = serde_json::from_str(&json).unwrap();
        assert_eq!(back, days);
    }
}
