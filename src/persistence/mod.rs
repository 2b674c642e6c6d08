//! Durable storage collaborator for the job store.
//!
//! The store calls [`Persistence::load`] once at startup and
//! [`Persistence::save`] with the full snapshot after every mutation.
//! Backends never see partial updates.

pub mod json;
pub mod memory;

pub use json::JsonFiles;
pub use memory::MemoryPersistence;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Job;

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Read every stored job: active jobs in queue order, then dismissed jobs
    /// in dismissal order. Unreadable or malformed storage yields an empty
    /// sequence, never an error.
    async fn load(&self) -> Vec<Job>;

    /// Replace stored state with `jobs`.
    async fn save(&self, jobs: &[Job]) -> Result<()>;
}
