use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::model::{Job, JobId};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    #[serde(alias = "payload")]
    pub data: String,
}

/// Body of dismiss and recall commands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobRef {
    pub id: JobId,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissedResponse {
    pub message: String,
    /// `Xm Ys`
    pub duration: String,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalledResponse {
    pub message: String,
    pub id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveJobView {
    pub id: JobId,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for ActiveJobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            payload: job.payload,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissedJobView {
    pub id: JobId,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub dismissed_at: DateTime<Utc>,
    pub duration: String,
    pub duration_secs: u64,
}

impl DismissedJobView {
    /// `None` for a job that is not dismissed.
    fn from_job(job: Job) -> Option<Self> {
        let dismissed_at = job.dismissed_at()?;
        let duration = job.duration()?;
        Some(Self {
            id: job.id,
            payload: job.payload,
            created_at: job.created_at,
            dismissed_at,
            duration: duration.to_string(),
            duration_secs: duration.as_secs(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active: usize,
    pub dismissed: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn create_job(
    State(state): State<ApiState>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let Json(req) = body?;
    let job = state.store.submit(req.data).await?;
    Ok(Json(CreatedResponse {
        message: "Print job received".to_string(),
        id: job.id,
    }))
}

pub(super) async fn list_active(State(state): State<ApiState>) -> Json<Vec<ActiveJobView>> {
    let jobs = state.store.list_active().await;
    Json(jobs.into_iter().map(ActiveJobView::from).collect())
}

pub(super) async fn dismiss_job(
    State(state): State<ApiState>,
    body: Result<Json<JobRef>, JsonRejection>,
) -> Result<Json<DismissedResponse>, ApiError> {
    let Json(JobRef { id }) = body?;
    let job = state.store.dismiss(id).await?;
    let duration = job.duration().unwrap_or_default();
    Ok(Json(DismissedResponse {
        message: "Order removed".to_string(),
        duration: duration.to_string(),
        duration_secs: duration.as_secs(),
    }))
}

pub(super) async fn list_dismissed(State(state): State<ApiState>) -> Json<Vec<DismissedJobView>> {
    let jobs = state.store.list_dismissed().await;
    Json(jobs.into_iter().filter_map(DismissedJobView::from_job).collect())
}

pub(super) async fn recall_job(
    State(state): State<ApiState>,
    body: Result<Json<JobRef>, JsonRejection>,
) -> Result<Json<RecalledResponse>, ApiError> {
    let Json(JobRef { id }) = body?;
    let job = state.store.recall(id).await?;
    Ok(Json(RecalledResponse {
        message: "Order recalled".to_string(),
        id: job.id,
    }))
}

pub(super) async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let (active, dismissed) = state.store.counts().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        active,
        dismissed,
    })
}
