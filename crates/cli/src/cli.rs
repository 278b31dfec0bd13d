use std::path::PathBuf;

use alarmd_core::{AlarmId, DaysOfWeek};
use clap::{Parser, Subcommand};

/// Alarm scheduler.
///
/// Keeps alarm definitions and snoozes under a data directory and arms a
/// single file-based wake for whichever alarm fires next.
#[derive(Parser, Debug)]
#[command(name = "alarmd", about = "Alarm next-fire scheduler")]
pub struct CliArgs {
    /// Config profile; keys are read as {PROFILE}_{KEY} first
    #[arg(long, env = "ALARMD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Directory holding alarm state (overrides ALARMD_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Zone alarm times are interpreted in: local, utc, or +HH:MM
    #[arg(long, global = true)]
    pub zone: Option<String>,

    /// Show times on a 12-hour clock
    #[arg(long, global = true)]
    pub twelve_hour: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all alarms
    List,

    /// Add an alarm at HH:MM (24-hour)
    Add {
        time: String,
        /// Repeat days: daily, weekdays, weekends, or e.g. mon,wed,fri
        #[arg(long)]
        days: Option<DaysOfWeek>,
        #[arg(long)]
        label: Option<String>,
        /// Store the alarm without enabling it
        #[arg(long)]
        disabled: bool,
    },

    /// Change an alarm's time, days, or label
    Edit {
        id: AlarmId,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        days: Option<DaysOfWeek>,
        #[arg(long)]
        label: Option<String>,
    },

    Delete { id: AlarmId },

    Enable { id: AlarmId },

    Disable { id: AlarmId },

    /// Snooze an alarm, by default for the configured snooze length
    Snooze {
        id: AlarmId,
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// Clear every pending snooze
    SnoozeClearAll,

    /// Cancel a pending snooze
    CancelSnooze { id: AlarmId },

    /// Dismiss an alarm; one-shot alarms are disabled
    Dismiss { id: AlarmId },

    /// Reconcile and show the next alarm
    Next,

    /// Boot-time reconciliation: disable expired one-shot alarms, then re-arm
    Boot,

    /// Re-arm after a wall-clock or timezone change
    TimeChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_days() {
        let args = CliArgs::parse_from([
            "alarmd", "add", "06:30", "--days", "weekdays", "--label", "work",
        ]);
        match args.command {
            Command::Add {
                time,
                days,
                label,
                disabled,
            } => {
                assert_eq!(time, "06:30");
                assert_eq!(days, Some(DaysOfWeek::weekdays()));
                assert_eq!(label.as_deref(), Some("work"));
                assert!(!disabled);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["alarmd", "snooze", "3", "--minutes", "5", "--zone", "utc"]);
        assert_eq!(args.zone.as_deref(), Some("utc"));
        assert!(matches!(
            args.command,
            Command::Snooze {
                id: AlarmId(3),
                minutes: Some(5)
            }
        ));
    }

    #[test]
    fn rejects_bad_id() {
        assert!(CliArgs::try_parse_from(["alarmd", "delete", "abc"]).is_err());
    }
}
