//! HTTP facade for the kitchen display.
//!
//! A thin layer over [`JobStore`]: list active, list dismissed, create,
//! dismiss, recall. Every response body is JSON.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{
    ActiveJobView, CreateJobRequest, CreatedResponse, DismissedJobView, DismissedResponse,
    HealthResponse, JobRef, RecalledResponse,
};

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{Error, Result};
use crate::store::JobStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<JobStore>,
}

/// Build the facade router.
pub fn router(store: Arc<JobStore>) -> Router {
    Router::new()
        .route("/api/print", post(handlers::create_job))
        .route("/api/orders", get(handlers::list_active))
        .route("/api/remove", post(handlers::dismiss_job))
        .route(
            "/api/recall",
            get(handlers::list_dismissed).post(handlers::recall_job),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { store })
}

/// Serve the facade on an already-bound socket until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: Arc<JobStore>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = ?listener.local_addr().ok(), "http facade started");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::Io)?;
    info!("http facade stopped");
    Ok(())
}
