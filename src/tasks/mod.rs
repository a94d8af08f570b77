//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the service.
//!
//! # Tasks
//! - Change watcher: rebuilds the live view and invalidates cached data on changes
//! - Metrics logger: periodically logs the performance summary

mod metrics_log;
mod watcher;

pub use metrics_log::spawn_metrics_logger;
pub use watcher::spawn_change_watcher;
