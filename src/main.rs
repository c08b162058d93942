//! punchd - Attendance reconciliation agent entry point
//!
//! Wires the scheduler, the device pipeline, and the background delivery
//! retry loop together and runs until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use punchd::attendance::store::JsonFileStore;
use punchd::config::{Config, DeviceBackend};
use punchd::db::queue::PendingQueue;
use punchd::device::fixture::FixtureConnector;
use punchd::pipeline::AttendancePipeline;
use punchd::scheduler::Scheduler;
use punchd::services::api_client::ApiClient;
use punchd::services::delivery::DeliveryService;
use punchd::timesync::HttpTimeSource;

/// Command-line arguments for punchd
#[derive(Parser, Debug)]
#[command(name = "punchd")]
#[command(about = "Attendance reconciliation agent for biometric time clocks")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PUNCHD_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (queue database, documents, snapshots)
    #[arg(short, long, env = "PUNCHD_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punchd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.resolved_data_dir());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    info!("Starting punchd (execution time {})", config.execution_time);
    info!("Data directory: {}", data_dir.display());

    let pool = punchd::db::init_database(&data_dir.join("punchd.db"))
        .await
        .context("Failed to initialize queue database")?;
    let queue = PendingQueue::new(pool, config.retry.max_attempts);

    let api = Arc::new(ApiClient::new(&config.api).context("Failed to build API client")?);

    // Background retry loop; sole delivery authority for queued payloads.
    let _retry_loop = DeliveryService::new(queue.clone(), api.clone(), config.retry.interval_secs).run();

    let store = JsonFileStore::new(data_dir.join("documents"));
    let connector = match config.device.backend {
        DeviceBackend::Fixture => FixtureConnector::new(&config.device.fixture_dir),
    };
    let pipeline = AttendancePipeline::new(connector, store, queue, api);

    let time_source = match &config.time.api_url {
        Some(url) => Some(
            HttpTimeSource::new(
                url.clone(),
                Duration::from_secs(config.time.request_timeout_secs),
            )
            .context("Failed to build time source")?,
        ),
        None => None,
    };
    let scheduler = Scheduler::new(
        config.execution_time.clone(),
        Duration::from_secs(config.poll_interval_secs),
        time_source,
    );

    tokio::select! {
        _ = scheduler.run(pipeline) => {},
        _ = shutdown_signal() => {
            info!("Shutdown complete");
        },
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
