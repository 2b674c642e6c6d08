//! Span helpers for printer connections and job transitions.

use std::net::SocketAddr;

use tracing::Span;

use crate::model::JobId;

/// Start a span covering one inbound printer connection.
///
/// `job.id` is declared empty and filled in once the payload is submitted.
pub fn connection_span(peer: SocketAddr) -> Span {
    tracing::info_span!(
        "ingest.connection",
        "net.peer" = %peer,
        "job.id" = tracing::field::Empty,
    )
}

/// Attach the created job's id to a connection span.
pub fn record_job_id(span: &Span, id: JobId) {
    span.record("job.id", id.0);
}

/// Record a state transition event on the given span.
pub fn record_transition(span: &Span, id: JobId, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(job_id = %id, from = from, to = to, "state_transition");
    });
}
