//! API Handlers
//!
//! HTTP request handlers for the monitoring service endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::dashboard::{DashboardService, DashboardStats};
use crate::error::{MonitorError, Result};
use crate::metrics::MetricsRecorder;
use crate::models::{
    CacheStatsResponse, ClearResponse, DocumentBody, DocumentPath, DocumentResponse,
    HealthResponse, MetricsResponse, Notification,
};
use crate::monitor::{
    ChangeKind, DocumentSource, LiveAggregator, LiveMonitor, LiveView, MemoryBackend,
};

/// Application state shared across all handlers.
///
/// Every field is a cheap handle; clones share the same underlying state.
#[derive(Clone)]
pub struct AppState {
    /// Document backend, also the source of change events
    pub backend: Arc<MemoryBackend>,
    /// Current live view
    pub monitor: LiveMonitor,
    /// Cached dashboard reads
    pub dashboard: DashboardService,
    /// Fetch latency recorder
    pub metrics: MetricsRecorder,
    /// Cache shared by the dashboard reads
    pub cache: TtlCache<Value>,
}

impl AppState {
    /// Wires the monitor, dashboard, cache and recorder over `backend`.
    pub fn new(backend: Arc<MemoryBackend>, config: &Config) -> Self {
        let metrics = MetricsRecorder::default();
        let cache = TtlCache::new(config.default_ttl());
        let source: Arc<dyn DocumentSource> = backend.clone();

        let monitor = LiveMonitor::new(LiveAggregator::from_config(
            source.clone(),
            metrics.clone(),
            config,
        ));
        let dashboard = DashboardService::from_config(source, cache.clone(), metrics.clone(), config);

        Self {
            backend,
            monitor,
            dashboard,
            metrics,
            cache,
        }
    }

    /// Creates state over an empty backend using `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(MemoryBackend::new(config.database_id.clone())), config)
    }

    pub fn source(&self) -> Arc<dyn DocumentSource> {
        self.backend.clone()
    }
}

/// Handler for GET /monitoring
///
/// Returns the current live view, building one if none exists yet.
pub async fn monitoring_handler(State(state): State<AppState>) -> Json<LiveView> {
    Json(state.monitor.current().await)
}

/// Handler for POST /monitoring/refresh
///
/// Retry action: forces a full fetch-and-join.
pub async fn refresh_handler(State(state): State<AppState>) -> Json<LiveView> {
    Json(state.monitor.refresh().await)
}

/// Handler for GET /dashboard/stats
pub async fn dashboard_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    Ok(Json(state.dashboard.dashboard_stats().await?))
}

/// Handler for GET /students/:id/notifications
pub async fn notifications_handler(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(state.dashboard.student_notifications(&student_id).await?))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse::new(state.metrics.summary()))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.cache.stats().into())
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear();
    Json(ClearResponse::new())
}

/// Handler for PUT /collections/:collection/documents/:id
///
/// Inserts or replaces a document; subscribers see the change.
pub async fn upsert_document_handler(
    State(state): State<AppState>,
    Path(path): Path<DocumentPath>,
    Json(body): Json<DocumentBody>,
) -> Result<Json<DocumentResponse>> {
    if let Some(error_msg) = path.validate() {
        return Err(MonitorError::InvalidRequest(error_msg));
    }

    let change = state.backend.upsert(&path.collection, &path.id, body.0).await;
    Ok(Json(DocumentResponse::new(path.collection, path.id, change)))
}

/// Handler for DELETE /collections/:collection/documents/:id
pub async fn delete_document_handler(
    State(state): State<AppState>,
    Path(path): Path<DocumentPath>,
) -> Result<Json<DocumentResponse>> {
    if let Some(error_msg) = path.validate() {
        return Err(MonitorError::InvalidRequest(error_msg));
    }

    state.backend.delete(&path.collection, &path.id).await?;
    Ok(Json(DocumentResponse::new(
        path.collection,
        path.id,
        ChangeKind::Delete,
    )))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        AppState::from_config(&Config::default())
    }

    fn path(collection: &str, id: &str) -> Path<DocumentPath> {
        Path(DocumentPath {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    fn body(value: Value) -> Json<DocumentBody> {
        Json(DocumentBody(value.as_object().cloned().unwrap()))
    }

    #[tokio::test]
    async fn test_upsert_then_monitoring() {
        let state = state();

        let created = upsert_document_handler(
            State(state.clone()),
            path("students", "stu-1"),
            body(json!({ "name": "Ada" })),
        )
        .await
        .unwrap();
        assert_eq!(created.change, ChangeKind::Create);

        let view = monitoring_handler(State(state)).await;
        assert_eq!(view.counts.total, 1);
        assert_eq!(view.counts.offline, 1);
    }

    #[tokio::test]
    async fn test_refresh_bumps_sequence() {
        let state = state();
        let first = refresh_handler(State(state.clone())).await;
        let second = refresh_handler(State(state)).await;
        assert!(second.sequence > first.sequence);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_path() {
        let result = upsert_document_handler(
            State(state()),
            path("bad.collection", "x"),
            body(json!({})),
        )
        .await;
        assert!(matches!(result, Err(MonitorError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_document() {
        let result = delete_document_handler(State(state()), path("students", "ghost")).await;
        assert!(matches!(result, Err(MonitorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_notifications_unknown_student() {
        let result = notifications_handler(State(state()), Path("ghost".to_string())).await;
        assert!(matches!(result, Err(MonitorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let state = state();
        dashboard_stats_handler(State(state.clone())).await.unwrap();

        let stats = cache_stats_handler(State(state.clone())).await;
        assert_eq!(stats.total_entries, 1);

        clear_cache_handler(State(state.clone())).await;
        let stats = cache_stats_handler(State(state)).await;
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn test_metrics_after_refresh() {
        let state = state();
        refresh_handler(State(state.clone())).await;

        let metrics = metrics_handler(State(state)).await;
        assert!(metrics.operations.contains_key("list_sessions"));
        assert!(metrics.operations.contains_key("fetch_and_join"));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
