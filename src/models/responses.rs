//! Response DTOs for the monitoring API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::metrics::MetricSummary;
use crate::monitor::ChangeKind;

/// Response body for the metrics endpoint (GET /metrics)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub operations: BTreeMap<String, MetricSummary>,
}

impl MetricsResponse {
    pub fn new(operations: BTreeMap<String, MetricSummary>) -> Self {
        Self { operations }
    }
}

/// Response body for the cache stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    /// Number of reads that returned a live value
    pub hits: u64,
    /// Number of reads that found nothing
    pub misses: u64,
    /// Number of entries dropped by TTL
    pub expirations: u64,
    /// Entries currently stored
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for document writes
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub message: String,
    pub collection: String,
    pub id: String,
    pub change: ChangeKind,
}

impl DocumentResponse {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, change: ChangeKind) -> Self {
        let collection = collection.into();
        let id = id.into();
        Self {
            message: format!("Document '{}' in '{}' {}", id, collection, change.past_tense()),
            collection,
            id,
            change,
        }
    }
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Current server timestamp
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a healthy response with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
