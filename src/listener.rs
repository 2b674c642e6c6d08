//! Ingestion listener: the virtual printer port.
//!
//! Accepts raw TCP connections, reads one bounded payload per connection,
//! and submits it to the job store. Each connection is handled on its own
//! task so a slow client never holds up the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::{Config, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_READ_TIMEOUT_SECS};
use crate::decoder::{self, DecodeError};
use crate::error::{Error, Result};
use crate::store::JobStore;
use crate::telemetry::job::{connection_span, record_job_id};
use crate::telemetry::metrics;

const READ_CHUNK: usize = 4096;

/// Per-connection read bounds.
#[derive(Debug, Clone, Copy)]
pub struct ListenerConfig {
    /// Bytes beyond this are left unread.
    pub max_payload_bytes: usize,
    /// The payload is whatever arrived before end-of-stream or this window closes.
    pub read_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for ListenerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            read_timeout: config.read_timeout,
        }
    }
}

/// The accept loop. Cheap to clone; clones share the socket and shutdown
/// signal, and one `shutdown()` stops every clone's `run()`.
#[derive(Clone)]
pub struct Listener {
    tcp: Arc<TcpListener>,
    store: Arc<JobStore>,
    config: ListenerConfig,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Listener {
    /// Bind the printer port.
    ///
    /// A bind failure is fatal and returned as `Error::Listener`.
    pub async fn bind(addr: SocketAddr, store: Arc<JobStore>, config: ListenerConfig) -> Result<Self> {
        let tcp = TcpListener::bind(addr).await.map_err(Error::Listener)?;
        Ok(Self {
            tcp: Arc::new(tcp),
            store,
            config,
            shutdown: Arc::new(watch::Sender::new(false)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.tcp.local_addr().map_err(Error::Listener)
    }

    /// Signal every accept loop to stop, including loops started after this
    /// call. In-flight connections finish on their own.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Accept connections until shutdown or a fatal accept error.
    pub async fn run(&self) -> Result<()> {
        info!(addr = ?self.tcp.local_addr().ok(), "printer listener started");
        let mut stop = self.shutdown.subscribe();

        loop {
            if *stop.borrow_and_update() {
                info!("printer listener shutting down");
                return Ok(());
            }

            let accepted = tokio::select! {
                // The sender lives in `self`, so this never reports a closed channel.
                _ = stop.changed() => continue,
                accepted = self.tcp.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted printer connection");
                    let store = Arc::clone(&self.store);
                    let config = self.config;
                    tokio::spawn(
                        handle_connection(store, stream, peer, config).instrument(connection_span(peer)),
                    );
                }
                Err(e) if is_per_connection(&e) => {
                    warn!("accept failed for one connection: {e}");
                }
                Err(e) => {
                    error!("printer listener accept failed: {e}");
                    return Err(Error::Listener(e));
                }
            }
        }
    }
}

/// Accept errors that concern a single peer rather than the socket.
fn is_per_connection(e: &std::io::Error) -> bool {
    use std::io::ErrorKind::*;
    matches!(e.kind(), ConnectionAborted | ConnectionReset | Interrupted | WouldBlock)
}

/// Read, decode, submit, close. Every outcome ends with the connection closed.
async fn handle_connection(
    store: Arc<JobStore>,
    mut stream: TcpStream,
    peer: SocketAddr,
    config: ListenerConfig,
) {
    let result = match read_payload(&mut stream, config.max_payload_bytes, config.read_timeout).await {
        Err(e) => {
            warn!(%peer, "error reading printer connection: {e}");
            "read_error"
        }
        Ok(bytes) => match decoder::decode(&bytes) {
            Err(DecodeError::Empty) => {
                info!(%peer, "no data received");
                "empty"
            }
            Ok(payload) => match store.submit(payload).await {
                Ok(job) => {
                    record_job_id(&tracing::Span::current(), job.id);
                    info!(%peer, job_id = %job.id, bytes = bytes.len(), "print job received");
                    "submitted"
                }
                Err(e) => {
                    error!(%peer, retryable = e.is_retryable(), "submitting print job failed: {e}");
                    "submit_error"
                }
            },
        },
    };

    metrics::ingest_connections().add(1, &[KeyValue::new("result", result)]);

    if let Err(e) = stream.shutdown().await {
        debug!(%peer, "closing printer connection: {e}");
    }
}

/// Read until end-of-stream, `max_bytes`, or the read window closes,
/// whichever comes first. A closed window is not an error: the payload is
/// what arrived before it.
pub(crate) async fn read_payload<R>(reader: &mut R, max_bytes: usize, window: Duration) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + window;
    let mut limited = reader.take(max_bytes as u64);
    let mut buf = Vec::with_capacity(max_bytes.min(READ_CHUNK));
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match tokio::time::timeout_at(deadline, limited.read(&mut chunk)).await {
            Err(_) => {
                debug!(bytes = buf.len(), "read window closed");
                break;
            }
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(e),
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_until_end_of_stream() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"Order A\n2x fries").await.unwrap();
        drop(client);

        let bytes = read_payload(&mut server, 1024, Duration::from_secs(5)).await.unwrap();
        assert_eq!(bytes, b"Order A\n2x fries");
    }

    #[tokio::test]
    async fn stops_at_max_bytes() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"0123456789").await.unwrap();

        let bytes = read_payload(&mut server, 4, Duration::from_secs(5)).await.unwrap();
        assert_eq!(bytes, b"0123");
    }

    #[tokio::test]
    async fn stalled_client_yields_what_arrived_before_window() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"partial").await.unwrap();
        // client stays open and silent

        let bytes = read_payload(&mut server, 1024, Duration::from_millis(50)).await.unwrap();
        assert_eq!(bytes, b"partial");
        drop(client);
    }

    #[tokio::test]
    async fn silent_client_yields_empty() {
        let (_client, mut server) = tokio::io::duplex(64);
        let bytes = read_payload(&mut server, 1024, Duration::from_millis(20)).await.unwrap();
        assert!(bytes.is_empty());
    }
}
