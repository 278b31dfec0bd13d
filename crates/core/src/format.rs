//! Human-readable rendering of alarm times.

use chrono::{DateTime, Utc};

use crate::alarm::AlarmRecord;
use crate::time::Zone;

const M24: &str = "%H:%M";
const M12: &str = "%-I:%M %p";
const DM24: &str = "%a %H:%M";
const DM12: &str = "%a %-I:%M %p";

/// Time of day, e.g. `07:30` or `7:30 AM`.
pub fn format_time(at: DateTime<Utc>, zone: Zone, use_24_hour: bool) -> String {
    let format = if use_24_hour { M24 } else { M12 };
    zone.naive_local(at).format(format).to_string()
}

/// Weekday and time, e.g. `Mon 07:30`. This is the "next alarm" string
/// published for external consumers.
pub fn format_day_and_time(at: DateTime<Utc>, zone: Zone, use_24_hour: bool) -> String {
    let format = if use_24_hour { DM24 } else { DM12 };
    zone.naive_local(at).format(format).to_string()
}

/// One-line summary of an alarm for listings.
pub fn describe_alarm(alarm: &AlarmRecord) -> String {
    let state = if alarm.enabled { "on " } else { "off" };
    let mut line = format!(
        "#{:<4} {} {:02}:{:02}  {}",
        alarm.id, state, alarm.hour, alarm.minute, alarm.days
    );
    if !alarm.label.is_empty() {
        line.push_str("  ");
        line.push_str(&alarm.label);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmId;
    use crate::days::DaysOfWeek;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn formats_24_and_12_hour() {
        let t = at("2026-10-19T19:05:00Z");
        assert_eq!(format_time(t, Zone::utc(), true), "19:05");
        assert_eq!(format_time(t, Zone::utc(), false), "7:05 PM");
    }

    #[test]
    fn formats_day_and_time_in_zone() {
        let t = at("2026-10-19T23:30:00Z");
        let zone: Zone = "+02:00".parse().unwrap();
        assert_eq!(format_day_and_time(t, zone, true), "Tue 01:30");
        assert_eq!(format_day_and_time(t, Zone::utc(), false), "Mon 11:30 PM");
    }

    #[test]
    fn describes_alarm() {
        let mut alarm = AlarmRecord::new(6, 5)
            .unwrap()
            .with_days(DaysOfWeek::weekdays())
            .with_label("work");
        alarm.id = AlarmId(3);
        assert_eq!(describe_alarm(&alarm), "#3    on  06:05  Mon, Tue, Wed, Thu, Fri  work");
    }
}
