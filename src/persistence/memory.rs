//! In-process persistence for tests and ephemeral runs.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Persistence;
use crate::error::{Error, Result};
use crate::model::Job;

/// Keeps the last saved snapshot in memory. Writes can be made to fail on
/// demand to exercise the store's persistence-failure path.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    jobs: Mutex<Vec<Job>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `jobs` already stored.
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last successfully saved snapshot.
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn load(&self) -> Vec<Job> {
        self.snapshot()
    }

    async fn save(&self, jobs: &[Job]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence("memory store is set to fail".to_string()));
        }
        *self.jobs.lock().unwrap_or_else(|e| e.into_inner()) = jobs.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
