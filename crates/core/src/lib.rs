pub mod alarm;
pub mod config;
pub mod days;
pub mod error;
pub mod format;
pub mod time;

pub use alarm::*;
pub use config::Config;
pub use days::DaysOfWeek;
pub use error::*;
pub use time::{next_occurrence, Clock, ManualClock, SystemClock, Zone};
