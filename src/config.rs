//! Typed configuration from environment variables.
//!
//! Loads once at startup. Every variable has a default; a value that is set
//! but unparseable fails fast.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PRINTER_ADDR: &str = "0.0.0.0:9999";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Raw TCP port the point-of-sale prints to.
    pub printer_addr: SocketAddr,
    /// HTTP facade bind address.
    pub http_addr: SocketAddr,
    /// Directory holding the JSON job files.
    pub data_dir: PathBuf,
    pub max_payload_bytes: usize,
    pub read_timeout: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            printer_addr: parsed_var("KDS_PRINTER_ADDR", DEFAULT_PRINTER_ADDR)?,
            http_addr: parsed_var("KDS_HTTP_ADDR", DEFAULT_HTTP_ADDR)?,
            data_dir: std::env::var("KDS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            max_payload_bytes: parsed_var(
                "KDS_MAX_PAYLOAD_BYTES",
                &DEFAULT_MAX_PAYLOAD_BYTES.to_string(),
            )?,
            read_timeout: Duration::from_secs(parsed_var(
                "KDS_READ_TIMEOUT_SECS",
                &DEFAULT_READ_TIMEOUT_SECS.to_string(),
            )?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parsed_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| Error::Config(format!("invalid value for {name} ({raw:?}): {e}")))
}
