//! # kds-rs
//!
//! A virtual kitchen printer. Point-of-sale systems print tickets to a raw TCP
//! port; each ticket becomes a job on the kitchen display, where staff dismiss
//! it when handled and can recall it from history.
//!
//! Provides the ingestion listener, the lock-guarded job store with JSON-file
//! persistence, an HTTP facade (axum) and OpenTelemetry observability.

pub mod api;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod error;
pub mod event;
pub mod listener;
pub mod model;
pub mod persistence;
pub mod store;
pub mod telemetry;
