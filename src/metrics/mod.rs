//! Metrics Module
//!
//! Rolling-window latency recording for fetches and other operations.

mod recorder;
mod series;

pub use recorder::MetricsRecorder;
pub use series::{MetricSeries, MetricSummary, Sample};

/// Samples kept per operation
pub const DEFAULT_WINDOW: usize = 100;
