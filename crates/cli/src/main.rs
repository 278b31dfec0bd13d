mod cli;

use std::sync::Arc;

use alarmd_core::config::load_dotenv;
use alarmd_core::format::{describe_alarm, format_day_and_time, format_time};
use alarmd_core::{parse_hh_mm, AlarmError, AlarmFilter, AlarmId, AlarmRecord, Config};
use alarmd_scheduler::file::{FileNextAlarmSetting, FileWakeTimer, TracingStatusSurface};
use alarmd_scheduler::{AlarmScheduler, NextAlarmDecision, SchedulerParts, SchedulerSettings};
use alarmd_store::{JsonAlarmStore, JsonSnoozeBackend};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(zone) = args.zone {
        config.zone = zone;
    }
    if args.twelve_hour {
        config.use_24_hour = false;
    }
    config.log_summary();

    let scheduler = open_scheduler(&config).context("failed to open alarm state")?;
    run(&scheduler, args.command).await
}

/// Wire the file-backed collaborators under the configured data directory.
fn open_scheduler(config: &Config) -> Result<AlarmScheduler> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let settings = SchedulerSettings::from_config(config)?;
    let parts = SchedulerParts {
        store: Arc::new(JsonAlarmStore::open(config.alarms_path())?),
        snooze_backend: Arc::new(JsonSnoozeBackend::new(config.snoozes_path())),
        timer: Arc::new(FileWakeTimer::new(config.wake_path())),
        status: Arc::new(TracingStatusSurface),
        next_alarm: Arc::new(FileNextAlarmSetting::new(config.next_alarm_path())),
    };
    Ok(AlarmScheduler::new(parts, settings)?)
}

async fn run(scheduler: &AlarmScheduler, command: Command) -> Result<()> {
    match command {
        Command::List => list(scheduler).await?,

        Command::Add {
            time,
            days,
            label,
            disabled,
        } => {
            let (hour, minute) = parse_hh_mm(&time)?;
            let mut alarm = AlarmRecord::new(hour, minute)?.with_days(days.unwrap_or_default());
            if let Some(label) = label {
                alarm = alarm.with_label(label);
            }
            if disabled {
                alarm = alarm.disabled();
            }
            if let Some((id, fire_at)) = applied(scheduler.add_alarm(alarm).await)? {
                println!("Added alarm #{} ({})", id, when(scheduler, fire_at));
            }
            print_next(scheduler).await;
        }

        Command::Edit {
            id,
            time,
            days,
            label,
        } => {
            let mut alarm = scheduler.get_alarm(id).await?;
            if let Some(time) = time {
                let (hour, minute) = parse_hh_mm(&time)?;
                alarm.hour = hour;
                alarm.minute = minute;
            }
            if let Some(days) = days {
                alarm.days = days;
            }
            if let Some(label) = label {
                alarm.label = label;
            }
            if let Some(fire_at) = applied(scheduler.update_alarm(alarm).await)? {
                println!("Updated alarm #{} ({})", id, when(scheduler, fire_at));
            }
            print_next(scheduler).await;
        }

        Command::Delete { id } => {
            applied(scheduler.delete_alarm(id).await)?;
            println!("Deleted alarm #{}", id);
            print_next(scheduler).await;
        }

        Command::Enable { id } => set_enabled(scheduler, id, true).await?,
        Command::Disable { id } => set_enabled(scheduler, id, false).await?,

        Command::Snooze { id, minutes } => {
            if let Some(fire_at) = applied(scheduler.snooze_for(id, minutes).await)? {
                println!("Snoozed alarm #{} until {}", id, when(scheduler, fire_at));
            }
            print_next(scheduler).await;
        }

        Command::SnoozeClearAll => {
            let now = scheduler.now();
            applied(scheduler.snooze_alarm(AlarmId::INVALID, now).await)?;
            println!("Cleared all snoozes");
            print_next(scheduler).await;
        }

        Command::CancelSnooze { id } => {
            match applied(scheduler.cancel_snooze(id).await)? {
                Some(false) => println!("Alarm #{} was not snoozed", id),
                _ => println!("Cancelled snooze of alarm #{}", id),
            }
            print_next(scheduler).await;
        }

        Command::Dismiss { id } => {
            applied(scheduler.dismiss(id).await)?;
            println!("Dismissed alarm #{}", id);
            print_next(scheduler).await;
        }

        Command::Next => {
            let now = scheduler.now();
            if let Some(decision) = applied(scheduler.reconcile_and_arm(now).await)? {
                print_decision(scheduler, &decision);
            } else {
                print_next(scheduler).await;
            }
        }

        Command::Boot => {
            info!("Running boot reconciliation");
            if let Some(decision) = applied(scheduler.on_boot().await)? {
                print_decision(scheduler, &decision);
            }
        }

        Command::TimeChanged => {
            if let Some(decision) = applied(scheduler.on_time_changed().await)? {
                print_decision(scheduler, &decision);
            }
        }
    }
    Ok(())
}

async fn list(scheduler: &AlarmScheduler) -> Result<()> {
    let alarms = scheduler.list_alarms(AlarmFilter::All).await?;
    if alarms.is_empty() {
        println!("No alarms");
        return Ok(());
    }
    let settings = scheduler.settings();
    for alarm in &alarms {
        match scheduler.snoozes().snooze_time_of(alarm.id) {
            Some(until) => println!(
                "{}  (snoozed until {})",
                describe_alarm(alarm),
                format_time(until, settings.zone, settings.use_24_hour)
            ),
            None => println!("{}", describe_alarm(alarm)),
        }
    }
    Ok(())
}

async fn set_enabled(scheduler: &AlarmScheduler, id: AlarmId, enabled: bool) -> Result<()> {
    applied(scheduler.set_enabled(id, enabled).await)?;
    println!(
        "Alarm #{} {}",
        id,
        if enabled { "enabled" } else { "disabled" }
    );
    print_next(scheduler).await;
    Ok(())
}

/// Treat a failure after the change was saved as a warning: the next
/// reconciliation retries it.
fn applied<T>(result: Result<T, AlarmError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_applied() => {
            warn!(error = %e, "change saved but reconciliation did not complete");
            eprintln!("warning: {} (saved; will retry on next reconcile)", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn when(scheduler: &AlarmScheduler, at: chrono::DateTime<chrono::Utc>) -> String {
    let settings = scheduler.settings();
    format_day_and_time(at, settings.zone, settings.use_24_hour)
}

async fn print_next(scheduler: &AlarmScheduler) {
    match scheduler.current_decision().await {
        Some(last) if !last.armed && last.decision.is_some() => {
            println!("Next alarm: not armed");
        }
        Some(last) => print_decision(scheduler, &last.decision),
        None => {}
    }
}

fn print_decision(scheduler: &AlarmScheduler, decision: &NextAlarmDecision) {
    match decision {
        Some(next) => {
            let days = if next.alarm.is_repeating() {
                format!(", {}", next.alarm.days)
            } else {
                String::new()
            };
            println!(
                "Next alarm: #{} {}{}{}",
                next.id(),
                when(scheduler, next.fire_at),
                days,
                if next.snoozed { " (snoozed)" } else { "" }
            );
        }
        None => println!("No alarm scheduled"),
    }
}
