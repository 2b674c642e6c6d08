//! Core data model.
//!
//! A job is one printed ticket. It has identity (a monotonically assigned id),
//! an opaque text payload, its ingestion time, and lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A print job tracked by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier, assigned once at submit and never reused.
    pub id: JobId,

    /// Ticket body as decoded from the printer connection.
    pub payload: String,

    /// Ingestion time. Survives recall unchanged.
    pub created_at: DateTime<Utc>,

    /// Current lifecycle state.
    #[serde(flatten)]
    pub state: JobState,
}

impl Job {
    pub fn new(id: JobId, payload: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            payload: payload.into(),
            created_at,
            state: JobState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, JobState::Active)
    }

    pub fn dismissed_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            JobState::Dismissed { dismissed_at, .. } => Some(dismissed_at),
            JobState::Active => None,
        }
    }

    pub fn duration(&self) -> Option<HandlingTime> {
        match self.state {
            JobState::Dismissed { duration, .. } => Some(duration),
            JobState::Active => None,
        }
    }

    /// Move to `Dismissed`, computing the handling time from `created_at` to `now`.
    ///
    /// Duration is computed fresh on every dismissal; a recalled job that is
    /// dismissed again measures from its original `created_at`.
    pub fn dismiss(&mut self, now: DateTime<Utc>) -> HandlingTime {
        let duration = HandlingTime::between(self.created_at, now);
        self.state = JobState::Dismissed {
            dismissed_at: now,
            duration,
        };
        duration
    }

    /// Return to `Active`, dropping the dismissal record.
    pub fn reactivate(&mut self) {
        self.state = JobState::Active;
    }
}

/// Newtype for job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
///
/// Dismissal data exists only in the `Dismissed` branch. Recall is not a
/// state of its own: a recalled job is `Active` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// On the live queue.
    Active,
    /// Handled and moved to recallable history.
    Dismissed {
        dismissed_at: DateTime<Utc>,
        #[serde(rename = "duration_secs")]
        duration: HandlingTime,
    },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Active => "active",
            JobState::Dismissed { .. } => "dismissed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Handling time
// ---------------------------------------------------------------------------

/// Whole seconds between ingestion and dismissal. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlingTime(u64);

impl HandlingTime {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Elapsed whole seconds from `start` to `end`, clamped to zero if the
    /// wall clock moved backwards in between.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let secs = (end - start).num_seconds();
        Self(u64::try_from(secs).unwrap_or(0))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn minutes(&self) -> u64 {
        self.0 / 60
    }

    pub fn seconds(&self) -> u64 {
        self.0 % 60
    }
}

/// Renders as `Xm Ys`.
impl std::fmt::Display for HandlingTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m {}s", self.minutes(), self.seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn handling_time_formats_minutes_and_seconds() {
        assert_eq!(HandlingTime::from_secs(65).to_string(), "1m 5s");
        assert_eq!(HandlingTime::from_secs(0).to_string(), "0m 0s");
        assert_eq!(HandlingTime::from_secs(3600).to_string(), "60m 0s");
    }

    #[test]
    fn handling_time_truncates_to_whole_seconds() {
        let end = t0() + Duration::milliseconds(65_999);
        assert_eq!(HandlingTime::between(t0(), end).as_secs(), 65);
    }

    #[test]
    fn handling_time_clamps_backwards_clock() {
        let end = t0() - Duration::seconds(30);
        assert_eq!(HandlingTime::between(t0(), end), HandlingTime::from_secs(0));
    }

    #[test]
    fn dismiss_then_reactivate_keeps_created_at() {
        let mut job = Job::new(JobId(1), "Order A", t0());
        let duration = job.dismiss(t0() + Duration::seconds(65));
        assert_eq!(duration.to_string(), "1m 5s");
        assert_eq!(job.dismissed_at(), Some(t0() + Duration::seconds(65)));
        assert!(!job.is_active());

        job.reactivate();
        assert!(job.is_active());
        assert_eq!(job.created_at, t0());
        assert_eq!(job.duration(), None);
        assert_eq!(job.dismissed_at(), None);
    }

    #[test]
    fn serialized_shape_carries_state_tag() {
        let mut job = Job::new(JobId(7), "2x burger", t0());
        let active = serde_json::to_value(&job).unwrap();
        assert_eq!(active["state"], "active");
        assert!(active.get("duration_secs").is_none());

        job.dismiss(t0() + Duration::seconds(90));
        let dismissed = serde_json::to_value(&job).unwrap();
        assert_eq!(dismissed["state"], "dismissed");
        assert_eq!(dismissed["duration_secs"], 90);
        assert_eq!(dismissed["id"], 7);

        let back: Job = serde_json::from_value(dismissed).unwrap();
        assert_eq!(back, job);
    }
}
