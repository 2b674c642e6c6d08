//! Structured events emitted by the store on every state change.
//!
//! Display clients subscribe to refresh on change instead of polling.
//! Events are published after the change is applied in memory, whether or
//! not the durable write succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::JobId;

/// A structured event emitted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Gap-free sequence number, assigned under the store lock.
    pub seq: u64,
    /// Clock reading of the change.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    JobSubmitted { id: JobId },
    JobDismissed { id: JobId, duration_secs: u64 },
    JobRecalled { id: JobId },
}

impl EventKind {
    pub fn job_id(&self) -> JobId {
        match self {
            EventKind::JobSubmitted { id }
            | EventKind::JobDismissed { id, .. }
            | EventKind::JobRecalled { id } => *id,
        }
    }
}
