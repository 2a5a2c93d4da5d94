mod config;
mod scheduler;

use anyhow::{Context, Result};
use hostlog_collector::{ProbeSet, SampleCollector};
use hostlog_storage::StorageBackend;
use scheduler::Scheduler;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the per-cycle JSON lines, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::from_filename("config/.env") {
        tracing::warn!(error = %e, "Failed to load config/.env");
    }

    let config_path = std::env::args().nth(1);
    let mut config = config::AgentConfig::load(config_path.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;

    tracing::info!(
        schema_mode = %config.schema_mode,
        interval_secs = config.collection_interval_secs,
        "hostlog-agent starting"
    );

    let mut storage = StorageBackend::connect(
        config.database_url.as_deref(),
        config.schema_mode,
        config.retention_days,
    )
    .context("failed to open log storage")?;
    storage
        .ensure_schema()
        .context("failed to prepare log storage")?;
    if !storage.is_durable() {
        tracing::warn!("DATABASE_URL not set, logs are kept in memory only");
    }

    let collector = SampleCollector::new(ProbeSet::system(&config.probe_options()));
    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let storage = Scheduler::new(collector, storage, config.interval())
        .run(shutdown)
        .await;
    storage.close().context("failed to close log storage")?;

    tracing::info!("hostlog-agent stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
