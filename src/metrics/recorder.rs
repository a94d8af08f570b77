//! Metrics Recorder Module
//!
//! Per-operation timing windows with start/stop timer pairing.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::metrics::{MetricSeries, MetricSummary, Sample, DEFAULT_WINDOW};

#[derive(Debug)]
struct RecorderInner {
    series: HashMap<String, MetricSeries>,
    /// At most one in-flight start per operation
    pending: HashMap<String, Instant>,
    window: usize,
}

impl RecorderInner {
    fn push(&mut self, operation: &str, value_ms: f64) {
        let window = self.window;
        self.series
            .entry(operation.to_string())
            .or_insert_with(|| MetricSeries::new(window))
            .push(Sample {
                value_ms,
                timestamp: Utc::now(),
            });
    }
}

// == Metrics Recorder ==
/// Cloneable handle to a shared set of metric series.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    inner: Arc<Mutex<RecorderInner>>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl MetricsRecorder {
    /// Creates a recorder keeping the latest `window` samples per operation.
    pub fn new(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderInner {
                series: HashMap::new(),
                pending: HashMap::new(),
                window,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecorderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Start Timer ==
    /// Marks the start of `operation`. A second start before `end_timer`
    /// replaces the first.
    pub fn start_timer(&self, operation: &str) {
        self.lock()
            .pending
            .insert(operation.to_string(), Instant::now());
    }

    // == End Timer ==
    /// Records the time since the matching `start_timer` and returns it.
    ///
    /// Without a pending start this records nothing and returns zero.
    pub fn end_timer(&self, operation: &str) -> Duration {
        let mut inner = self.lock();
        let Some(started) = inner.pending.remove(operation) else {
            return Duration::ZERO;
        };

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        inner.push(operation, elapsed_ms);
        debug!(operation, elapsed_ms, "timer ended");
        elapsed
    }

    // == Record Metric ==
    /// Appends an out-of-band sample without timing.
    pub fn record_metric(&self, operation: &str, value_ms: f64) {
        self.lock().push(operation, value_ms);
    }

    // == Measure ==
    /// Awaits `future` between `start_timer` and `end_timer` for `operation`.
    pub async fn measure<F, T>(&self, operation: &str, future: F) -> T
    where
        F: Future<Output = T>,
    {
        self.start_timer(operation);
        let output = future.await;
        self.end_timer(operation);
        output
    }

    // == Reads ==
    /// Mean of the operation's window, 0.0 when it has no samples.
    pub fn average_time(&self, operation: &str) -> f64 {
        self.lock()
            .series
            .get(operation)
            .map(MetricSeries::average)
            .unwrap_or(0.0)
    }

    /// Summary for one operation; zeroed when it has no samples.
    pub fn operation_summary(&self, operation: &str) -> MetricSummary {
        self.lock()
            .series
            .get(operation)
            .map(MetricSeries::summary)
            .unwrap_or_default()
    }

    /// Summaries for every operation with samples, keyed by name.
    pub fn summary(&self) -> BTreeMap<String, MetricSummary> {
        self.lock()
            .series
            .iter()
            .map(|(name, series)| (name.clone(), series.summary()))
            .collect()
    }

    /// Number of samples currently held for `operation`.
    pub fn sample_count(&self, operation: &str) -> usize {
        self.lock()
            .series
            .get(operation)
            .map(MetricSeries::len)
            .unwrap_or(0)
    }

    // == Clear ==
    /// Drops every series and every pending start.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.series.clear();
        inner.pending.clear();
    }

    // == Log Summary ==
    /// Emits the summary at info level; the only diagnostic consumer.
    pub fn log_summary(&self) {
        for (operation, s) in self.summary() {
            info!(
                operation = %operation,
                count = s.count,
                avg_ms = s.average,
                min_ms = s.min,
                max_ms = s.max,
                latest_ms = s.latest,
                "performance summary"
            );
        }
    }
}
