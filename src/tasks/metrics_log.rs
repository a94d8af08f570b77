//! Metrics Summary Task
//!
//! Background task that periodically logs the performance summary.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::metrics::MetricsRecorder;

/// Spawns a task logging `metrics.log_summary()` every `interval_secs`.
///
/// Returns the handle so shutdown can abort it.
pub fn spawn_metrics_logger(metrics: MetricsRecorder, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting metrics summary logging every {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;
            metrics.log_summary();
        }
    })
}
