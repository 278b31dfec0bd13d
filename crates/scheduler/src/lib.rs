//! Next-alarm scheduling engine.
//!
//! This crate provides:
//! - `SnoozeRegistry`: per-alarm snooze overrides with durable backing
//! - `NextAlarmResolver`: merges stored alarms and snooze overrides into a
//!   single next-fire decision
//! - `AlarmScheduler`: mutation entry points that all funnel through
//!   resolve → arm/disarm against the wake timer and status surface
//! - Collaborator traits (`WakeTimer`, `StatusSurface`, `NextAlarmSetting`)
//!   with file, tracing, and in-memory implementations

pub mod error;
pub mod file;
pub mod memory;
pub mod resolver;
pub mod scheduler;
pub mod snooze;
pub mod traits;

pub use error::{SurfaceError, TimerError};
pub use resolver::{NextAlarm, NextAlarmDecision, NextAlarmResolver};
pub use scheduler::{AlarmScheduler, AppliedDecision, NextAlarmEvent, SchedulerParts, SchedulerSettings};
pub use snooze::SnoozeRegistry;
pub use traits::{NextAlarmSetting, StatusSurface, WakePayload, WakeTimer};
