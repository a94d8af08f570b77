//! Exam Monitor - live monitoring service for an exam portal
//!
//! Serves the live student view, cached dashboard reads and fetch metrics.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_monitor::api::{create_router, AppState};
use exam_monitor::monitor::{MemoryBackend, SeedData};
use exam_monitor::tasks::{spawn_change_watcher, spawn_metrics_logger};
use exam_monitor::Config;

/// Main entry point for the exam monitor.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the document backend, seeding it when `SEED_FILE` is set
/// 4. Start the change watcher and optional metrics logger
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exam_monitor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Exam Monitor");

    let config = Config::from_env();
    info!(
        "Configuration loaded: database={}, default_ttl={}s, page_limit={}, fetch_timeout={}s, port={}",
        config.database_id,
        config.default_ttl,
        config.page_limit,
        config.fetch_timeout,
        config.server_port
    );

    let backend = Arc::new(MemoryBackend::new(config.database_id.clone()));
    if let Some(path) = &config.seed_file {
        let loaded = backend.seed(load_seed(path)?).await?;
        info!("Seeded {} documents from {}", loaded, path.display());
    }

    let state = AppState::new(backend, &config);

    let mut background = vec![spawn_change_watcher(
        state.source(),
        state.monitor.clone(),
        state.dashboard.clone(),
        state.backend.database_id(),
        &config.collections,
    )];
    info!("Change watcher started");

    if config.metrics_log_interval > 0 {
        background.push(spawn_metrics_logger(
            state.metrics.clone(),
            config.metrics_log_interval,
        ));
    }

    // Build the first view before serving.
    let view = state.monitor.refresh().await;
    info!(
        "Initial view: {} students, {} online, {} in exam",
        view.counts.total, view.counts.online, view.counts.in_exam
    );

    let cache = state.cache.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("Server error")?;

    cache.close();
    info!("Server shutdown complete");
    Ok(())
}

fn load_seed(path: &Path) -> anyhow::Result<SeedData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Seed file {} is not a collection map", path.display()))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
