//! End-to-end tests for the printer listener over real sockets.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kds_rs::error::Error;
use kds_rs::listener::{Listener, ListenerConfig};
use kds_rs::persistence::MemoryPersistence;
use kds_rs::store::JobStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

fn test_config() -> ListenerConfig {
    ListenerConfig {
        max_payload_bytes: 1024,
        read_timeout: Duration::from_secs(2),
    }
}

async fn start(store: Arc<JobStore>) -> (Listener, SocketAddr, JoinHandle<kds_rs::error::Result<()>>) {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), store, test_config())
        .await
        .expect("bind printer listener");
    let addr = listener.local_addr().unwrap();
    let runner = listener.clone();
    let handle = tokio::spawn(async move { runner.run().await });
    (listener, addr, handle)
}

async fn print(addr: SocketAddr, text: &str) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(text.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
}

/// Poll until the store holds `n` active jobs.
async fn wait_for_jobs(store: &JobStore, n: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if store.list_active().await.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {n} jobs"));
}

#[tokio::test]
async fn payload_becomes_an_active_job() {
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);
    let (listener, addr, handle) = start(Arc::clone(&store)).await;

    print(addr, "Order A\n1x burger\n").await;
    wait_for_jobs(&store, 1).await;

    let active = store.list_active().await;
    assert_eq!(active[0].payload, "Order A\n1x burger\n");
    assert_eq!(active[0].id.0, 1);

    listener.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn hundred_simultaneous_connections_yield_hundred_jobs() {
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);
    let (listener, addr, handle) = start(Arc::clone(&store)).await;

    let mut senders = Vec::new();
    for i in 0..100 {
        senders.push(tokio::spawn(async move {
            print(addr, &format!("ticket #{i}")).await;
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    wait_for_jobs(&store, 100).await;
    let jobs = store.list_active().await;
    assert_eq!(jobs.len(), 100);

    let ids: HashSet<u64> = jobs.iter().map(|j| j.id.0).collect();
    assert_eq!(ids.len(), 100);

    let payloads: HashSet<String> = jobs.into_iter().map(|j| j.payload).collect();
    let expected: HashSet<String> = (0..100).map(|i| format!("ticket #{i}")).collect();
    assert_eq!(payloads, expected);

    listener.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn empty_connection_creates_no_job_and_is_closed() {
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);
    let (listener, addr, handle) = start(Arc::clone(&store)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.shutdown().await.unwrap();

    // Server closes its side after handling
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server should close the connection")
        .unwrap();
    assert_eq!(n, 0);
    assert!(store.list_active().await.is_empty());

    // The listener keeps serving
    print(addr, "after empty").await;
    wait_for_jobs(&store, 1).await;
    assert_eq!(store.list_active().await[0].payload, "after empty");

    listener.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn submit_failure_still_closes_connection_and_keeps_listening() {
    let persistence = Arc::new(MemoryPersistence::new());
    persistence.set_failing(true);
    let store = Arc::new(JobStore::open(persistence.clone()).await);
    let (listener, addr, handle) = start(Arc::clone(&store)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"unsaved").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server should close the connection")
        .unwrap();
    assert_eq!(n, 0);

    // Job is kept in memory even though the write failed
    wait_for_jobs(&store, 1).await;
    assert!(persistence.snapshot().is_empty());

    persistence.set_failing(false);
    print(addr, "saved").await;
    wait_for_jobs(&store, 2).await;
    assert_eq!(persistence.snapshot().len(), 2);

    listener.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_payload_is_truncated_to_bound() {
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);
    let (listener, addr, handle) = start(Arc::clone(&store)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    // Do not wait for the write to finish: the server stops reading at the bound.
    let _ = stream.write_all(&vec![b'x'; 4096]).await;
    let _ = stream.shutdown().await;

    wait_for_jobs(&store, 1).await;
    assert_eq!(store.list_active().await[0].payload.len(), 1024);

    listener.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);

    let result = Listener::bind(addr, store, test_config()).await;
    assert!(matches!(result, Err(Error::Listener(_))));
}

#[tokio::test]
async fn one_shutdown_stops_every_running_clone() {
    let store = Arc::new(JobStore::open(Arc::new(MemoryPersistence::new())).await);
    let (listener, addr, first) = start(Arc::clone(&store)).await;
    let second_runner = listener.clone();
    let second = tokio::spawn(async move { second_runner.run().await });

    print(addr, "Order A").await;
    wait_for_jobs(&store, 1).await;

    listener.shutdown();
    for handle in [first, second] {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner did not stop")
            .unwrap()
            .unwrap();
    }

    // A loop started after shutdown returns at once.
    listener.run().await.unwrap();
}
