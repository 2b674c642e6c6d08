//! JSON file persistence.
//!
//! Active jobs live in `orders.json`, dismissed history in
//! `dismissed_orders.json`. Each file is rewritten whole on every save via a
//! temp file and rename, so a reader never sees a half-written array. A save
//! touches the files in an order that keeps every job in at least one of them
//! if it stops partway.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Persistence;
use crate::error::{Error, Result};
use crate::model::{Job, JobId};

pub const ACTIVE_FILE: &str = "orders.json";
pub const DISMISSED_FILE: &str = "dismissed_orders.json";

/// Two-file JSON backend rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFiles {
    active_path: PathBuf,
    dismissed_path: PathBuf,
}

impl JsonFiles {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            active_path: dir.join(ACTIVE_FILE),
            dismissed_path: dir.join(DISMISSED_FILE),
        }
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    pub fn dismissed_path(&self) -> &Path {
        &self.dismissed_path
    }
}

#[async_trait]
impl Persistence for JsonFiles {
    async fn load(&self) -> Vec<Job> {
        let active = read_jobs(&self.active_path).await;
        let dismissed = read_jobs(&self.dismissed_path).await;

        // Saves stage the full snapshot in the dismissed file before touching
        // the active one, so a job found in both has its newer record there.
        let dismissed_ids: HashSet<JobId> = dismissed.iter().map(|j| j.id).collect();
        let (mut jobs, superseded): (Vec<Job>, Vec<Job>) = active
            .into_iter()
            .partition(|j| !dismissed_ids.contains(&j.id));
        if !superseded.is_empty() {
            let ids: Vec<u64> = superseded.iter().map(|j| j.id.0).collect();
            warn!(
                path = %self.active_path.display(),
                job_ids = ?ids,
                "dropping job records superseded by {DISMISSED_FILE}"
            );
        }
        jobs.extend(dismissed);

        let misplaced = jobs
            .iter()
            .filter(|j| dismissed_ids.contains(&j.id) == j.is_active())
            .count();
        if misplaced > 0 {
            warn!(misplaced, "job files hold records from an interrupted save, keeping them by state");
        }

        debug!(jobs = jobs.len(), "loaded jobs from json files");
        jobs
    }

    async fn save(&self, jobs: &[Job]) -> Result<()> {
        let (active, dismissed): (Vec<&Job>, Vec<&Job>) = jobs.iter().partition(|j| j.is_active());

        // Stage the whole snapshot in the dismissed file first. Whichever
        // write fails, every job is still on disk in at least one file.
        let all: Vec<&Job> = jobs.iter().collect();
        write_atomic(&self.dismissed_path, &all).await?;
        write_atomic(&self.active_path, &active).await?;
        write_atomic(&self.dismissed_path, &dismissed).await?;
        Ok(())
    }
}

async fn read_jobs(path: &Path) -> Vec<Job> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), "cannot read job file, starting empty: {e}");
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!(path = %path.display(), "malformed job file, starting empty: {e}");
            Vec::new()
        }
    }
}

async fn write_atomic(path: &Path, jobs: &[&Job]) -> Result<()> {
    let json = serde_json::to_vec_pretty(jobs)?;
    let tmp = path.with_extension("json.tmp");

    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| Error::Persistence(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Persistence(format!("rename to {}: {e}", path.display())))?;
    Ok(())
}
