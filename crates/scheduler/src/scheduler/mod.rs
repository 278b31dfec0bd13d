//! Alarm scheduling entry points.
//!
//! [`AlarmScheduler`] owns the resolve → arm cycle. Every mutation (add,
//! update, delete, enable/disable, snooze, dismiss) writes through the store
//! and snooze registry first, then re-resolves from scratch and applies the
//! result to the wake timer, the status surface, and the next-alarm setting.
//! Boot and time-change signals call the same cycle to self-heal.

mod core;
mod events;

#[cfg(test)]
mod tests;

pub use self::core::{AlarmScheduler, SchedulerParts, SchedulerSettings};
pub use self::events::{AppliedDecision, NextAlarmEvent};
