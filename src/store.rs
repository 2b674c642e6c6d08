//! Job store: the lifecycle core.
//!
//! Single source of truth for all job state. The active queue and the
//! dismissed history sit behind one lock, so a job is always in exactly one
//! of them and every reader sees a consistent snapshot. Mutations are
//! persisted while the lock is held, which keeps durable writes in the same
//! order as the in-memory changes they record.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::sync::{Mutex, broadcast};
use tracing::{Span, debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::{Job, JobId};
use crate::persistence::Persistence;
use crate::telemetry::{self, metrics};

const EVENT_CAPACITY: usize = 256;

/// The job store. Owns all state and enforces all lifecycle invariants.
pub struct JobStore {
    inner: Mutex<Inner>,
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Event>,
}

/// Lock-guarded state. Everything here changes together or not at all.
struct Inner {
    next_id: u64,
    next_seq: u64,
    /// Queue order: ingestion order, recalled jobs appended at the end.
    active: Vec<Job>,
    /// Dismissal order, oldest first.
    dismissed: Vec<Job>,
}

impl JobStore {
    /// Open a store seeded from `persistence`, using the wall clock.
    pub async fn open(persistence: Arc<dyn Persistence>) -> Self {
        Self::with_clock(persistence, Arc::new(SystemClock)).await
    }

    /// Open a store seeded from `persistence` with an explicit clock.
    pub async fn with_clock(persistence: Arc<dyn Persistence>, clock: Arc<dyn Clock>) -> Self {
        let jobs = persistence.load().await;
        let inner = Inner::from_jobs(jobs);
        info!(
            active = inner.active.len(),
            dismissed = inner.dismissed.len(),
            next_id = inner.next_id,
            "job store opened"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(inner),
            persistence,
            clock,
            events,
        }
    }

    /// Subscribe to lifecycle events committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Create a new active job from a decoded payload.
    ///
    /// On `Error::Persistence` the job is still queued in memory; a retried
    /// submit would create a second job, so callers retry with [`flush`].
    ///
    /// [`flush`]: JobStore::flush
    pub async fn submit(&self, payload: impl Into<String>) -> Result<Job> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        let job = inner.submit(payload.into(), now);
        info!(job_id = %job.id, bytes = job.payload.len(), "job submitted");
        metrics::jobs_submitted().add(1, &[]);
        self.publish(&mut inner, EventKind::JobSubmitted { id: job.id }, now);

        self.persist(&inner, "submit").await?;
        Ok(job)
    }

    /// Move an active job to the dismissed history, recording how long it
    /// was on the queue.
    pub async fn dismiss(&self, id: JobId) -> Result<Job> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        let job = inner.dismiss(id, now)?;
        let duration = job.duration().unwrap_or_default();
        info!(job_id = %id, duration = %duration, "job dismissed");
        record_transition(id, "active", "dismissed");
        metrics::handling_time_secs().record(duration.as_secs() as f64, &[]);
        self.publish(
            &mut inner,
            EventKind::JobDismissed {
                id,
                duration_secs: duration.as_secs(),
            },
            now,
        );

        self.persist(&inner, "dismiss").await?;
        Ok(job)
    }

    /// Return a dismissed job to the end of the active queue.
    pub async fn recall(&self, id: JobId) -> Result<Job> {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();

        let job = inner.recall(id)?;
        info!(job_id = %id, "job recalled");
        record_transition(id, "dismissed", "active");
        self.publish(&mut inner, EventKind::JobRecalled { id }, now);

        self.persist(&inner, "recall").await?;
        Ok(job)
    }

    /// Re-persist the current state. Retry path after a persistence failure.
    pub async fn flush(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        self.persist(&inner, "flush").await
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Active jobs in queue order.
    pub async fn list_active(&self) -> Vec<Job> {
        self.inner.lock().await.active.clone()
    }

    /// Dismissed jobs, most recently dismissed first.
    pub async fn list_dismissed(&self) -> Vec<Job> {
        self.inner
            .lock()
            .await
            .dismissed
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    /// `(active, dismissed)` counts from one snapshot.
    pub async fn counts(&self) -> (usize, usize) {
        let inner = self.inner.lock().await;
        (inner.active.len(), inner.dismissed.len())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn publish(&self, inner: &mut Inner, kind: EventKind, now: DateTime<Utc>) {
        let event = inner.next_event(kind, now);
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn persist(&self, inner: &Inner, operation: &'static str) -> Result<()> {
        let snapshot = inner.snapshot();
        match self.persistence.save(&snapshot).await {
            Ok(()) => {
                debug!(operation, jobs = snapshot.len(), "state persisted");
                Ok(())
            }
            Err(e) => {
                warn!(operation, "persisting job state failed: {e}");
                metrics::persistence_failures().add(1, &[KeyValue::new("operation", operation)]);
                Err(match e {
                    Error::Persistence(_) => e,
                    other => Error::Persistence(other.to_string()),
                })
            }
        }
    }
}

fn record_transition(id: JobId, from: &'static str, to: &'static str) {
    telemetry::job::record_transition(&Span::current(), id, from, to);
    metrics::job_transitions().add(1, &[KeyValue::new("from", from), KeyValue::new("to", to)]);
}

impl Inner {
    fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut seen = HashSet::new();
        let mut active = Vec::new();
        let mut dismissed = Vec::new();

        for job in jobs {
            if !seen.insert(job.id) {
                warn!(job_id = %job.id, "duplicate job id in stored state, keeping first");
                continue;
            }
            if job.is_active() {
                active.push(job);
            } else {
                dismissed.push(job);
            }
        }

        let next_id = seen.iter().map(|id| id.0).max().map_or(1, |max| max + 1);
        Self {
            next_id,
            next_seq: 1,
            active,
            dismissed,
        }
    }

    fn snapshot(&self) -> Vec<Job> {
        self.active.iter().chain(self.dismissed.iter()).cloned().collect()
    }

    fn submit(&mut self, payload: String, now: DateTime<Utc>) -> Job {
        let id = JobId(self.next_id);
        self.next_id += 1;

        let job = Job::new(id, payload, now);
        self.active.push(job.clone());
        job
    }

    fn dismiss(&mut self, id: JobId, now: DateTime<Utc>) -> Result<Job> {
        let pos = self
            .active
            .iter()
            .position(|j| j.id == id)
            .ok_or(Error::NotFound(id))?;

        let mut job = self.active.remove(pos);
        job.dismiss(now);
        self.dismissed.push(job.clone());
        Ok(job)
    }

    fn recall(&mut self, id: JobId) -> Result<Job> {
        let pos = self
            .dismissed
            .iter()
            .position(|j| j.id == id)
            .ok_or(Error::NotFound(id))?;

        let mut job = self.dismissed.remove(pos);
        job.reactivate();
        self.active.push(job.clone());
        Ok(job)
    }

    fn next_event(&mut self, kind: EventKind, now: DateTime<Utc>) -> Event {
        let seq = self.next_seq;
        self.next_seq += 1;
        Event {
            seq,
            timestamp: now,
            kind,
        }
    }
}
