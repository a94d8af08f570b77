//! Exam Monitor - live monitoring for an exam portal
//!
//! Joins students, sessions, attempts and exams into a live status view,
//! caches dashboard reads behind a TTL cache, and records fetch latency.

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{MonitorError, Result};
pub use tasks::{spawn_change_watcher, spawn_metrics_logger};
