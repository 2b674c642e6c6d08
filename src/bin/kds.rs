//! kds CLI: run the virtual printer, send test tickets, inspect stored jobs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use kds_rs::api;
use kds_rs::config::Config;
use kds_rs::listener::{Listener, ListenerConfig};
use kds_rs::model::{Job, JobState};
use kds_rs::persistence::{JsonFiles, Persistence};
use kds_rs::store::JobStore;
use kds_rs::telemetry::{TelemetryConfig, init_telemetry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kds", about = "Virtual kitchen printer and order display backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the printer listener and the HTTP facade
    Serve {
        /// Raw TCP address the point-of-sale prints to
        #[arg(long)]
        printer_addr: Option<SocketAddr>,
        /// HTTP facade address
        #[arg(long)]
        http_addr: Option<SocketAddr>,
        /// Directory for the JSON job files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print a ticket to a running listener, like a point-of-sale would
    Send {
        /// Printer address
        #[arg(long, default_value = "127.0.0.1:9999")]
        addr: String,
        /// Ticket text; read from stdin when omitted
        text: Option<String>,
    },
    /// List stored jobs
    Jobs {
        /// Show dismissed history instead of the active queue
        #[arg(long)]
        dismissed: bool,
        /// Directory holding the JSON job files
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            printer_addr,
            http_addr,
            data_dir,
        } => {
            let mut config = Config::from_env()?;
            if let Some(addr) = printer_addr {
                config.printer_addr = addr;
            }
            if let Some(addr) = http_addr {
                config.http_addr = addr;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            cmd_serve(config).await
        }
        Command::Send { addr, text } => cmd_send(&addr, text).await,
        Command::Jobs {
            dismissed,
            data_dir,
        } => {
            let dir = match data_dir {
                Some(dir) => dir,
                None => Config::from_env()?.data_dir,
            };
            cmd_jobs(dir, dismissed).await
        }
    }
}

async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "kds".to_string(),
        log_level: config.log_level.clone(),
    })?;

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("cannot create data dir {}", config.data_dir.display()))?;

    let store = Arc::new(JobStore::open(Arc::new(JsonFiles::new(&config.data_dir))).await);

    let listener = Listener::bind(
        config.printer_addr,
        Arc::clone(&store),
        ListenerConfig::from(&config),
    )
    .await
    .with_context(|| format!("cannot bind printer port {}", config.printer_addr))?;

    let http = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("cannot bind http facade {}", config.http_addr))?;

    let (stop_http, http_stop) = oneshot::channel::<()>();
    let ctrl = listener.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown requested");
        ctrl.shutdown();
        let _ = stop_http.send(());
    });

    let http_task = tokio::spawn(api::serve(http, Arc::clone(&store), async {
        http_stop.await.ok();
    }));

    listener.run().await?;
    http_task.await??;

    if let Err(e) = store.flush().await {
        warn!("final flush failed: {e}");
    }
    Ok(())
}

async fn cmd_send(addr: &str, text: Option<String>) -> anyhow::Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to printer at {addr}"))?;
    stream.write_all(text.as_bytes()).await?;
    stream.shutdown().await?;

    println!("Sent {} bytes to {addr}", text.len());
    Ok(())
}

async fn cmd_jobs(data_dir: PathBuf, dismissed: bool) -> anyhow::Result<()> {
    let jobs: Vec<Job> = JsonFiles::new(&data_dir)
        .load()
        .await
        .into_iter()
        .filter(|job| job.is_active() != dismissed)
        .collect();

    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<10}  {:<17}  {:<9}  PAYLOAD",
        "ID", "STATE", "CREATED", "DURATION"
    );
    println!("{}", "-".repeat(80));

    for job in &jobs {
        let duration = match job.state {
            JobState::Dismissed { duration, .. } => duration.to_string(),
            JobState::Active => "-".to_string(),
        };
        let first_line = job.payload.lines().next().unwrap_or("");
        let preview: String = first_line.chars().take(30).collect();
        println!(
            "{:<6}  {:<10}  {:<17}  {:<9}  {}",
            job.id.0,
            job.state.name(),
            job.created_at.format("%m-%d-%y %I:%M %p"),
            duration,
            preview
        );
    }

    println!("\n{} job(s)", jobs.len());
    Ok(())
}
