//! Persistence for alarm definitions and snooze overrides.
//!
//! This crate provides:
//! - `AlarmStore` trait: CRUD + predicate query over alarm records
//! - In-memory and JSON-file alarm stores
//! - `SnoozeBackend` trait with in-memory and JSON-file backends

pub mod error;
pub mod file;
pub mod memory;
pub mod snooze;
mod table;
pub mod traits;

pub use error::StoreError;
pub use file::JsonAlarmStore;
pub use memory::MemoryAlarmStore;
pub use snooze::{JsonSnoozeBackend, MemorySnoozeBackend, SnoozeBackend, SnoozeMap};
pub use traits::AlarmStore;
