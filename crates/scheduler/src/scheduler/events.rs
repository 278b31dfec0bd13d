//! Reconciliation outcome types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::resolver::NextAlarmDecision;

/// The decision most recently applied to the wake timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDecision {
    pub decision: NextAlarmDecision,
    /// False when there is nothing to arm or the timer rejected the request.
    /// A rejected decision is retried on the next reconciliation.
    pub armed: bool,
    /// Whether the wake timer reflects `decision`. False after a rejected
    /// arm or a failed cancel.
    pub synced: bool,
    /// Instant the reconciliation ran at.
    pub at: DateTime<Utc>,
}

/// Broadcast after every reconciliation ("next alarm time set").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAlarmEvent {
    pub decision: NextAlarmDecision,
    /// The published next-alarm string; empty when nothing is armed.
    pub formatted: String,
    pub reconciled_at: DateTime<Utc>,
}
