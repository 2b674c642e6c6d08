//! Metric instrument factories for kds-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"kds-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for kds-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("kds-rs")
}

/// Counter: jobs created from printer payloads.
pub fn jobs_submitted() -> Counter<u64> {
    meter()
        .u64_counter("kds.jobs.submitted")
        .with_description("Number of print jobs submitted")
        .build()
}

/// Counter: job lifecycle transitions.
/// Labels: `from`, `to`.
pub fn job_transitions() -> Counter<u64> {
    meter()
        .u64_counter("kds.jobs.transitions")
        .with_description("Number of job state transitions")
        .build()
}

/// Histogram: seconds from ingestion to dismissal.
pub fn handling_time_secs() -> Histogram<f64> {
    meter()
        .f64_histogram("kds.jobs.handling_time_secs")
        .with_description("Time a job spent on the active queue before dismissal")
        .with_unit("s")
        .build()
}

/// Counter: failed durable writes.
/// Labels: `operation` ("submit" | "dismiss" | "recall" | "flush").
pub fn persistence_failures() -> Counter<u64> {
    meter()
        .u64_counter("kds.persistence.failures")
        .with_description("Number of failed job state writes")
        .build()
}

/// Counter: inbound printer connections.
/// Labels: `result` ("submitted" | "empty" | "read_error" | "submit_error").
pub fn ingest_connections() -> Counter<u64> {
    meter()
        .u64_counter("kds.ingest.connections")
        .with_description("Number of printer connections handled")
        .build()
}
