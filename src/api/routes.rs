//! API Routes
//!
//! Configures the Axum router with all monitoring service endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, clear_cache_handler, dashboard_stats_handler, delete_document_handler,
    health_handler, metrics_handler, monitoring_handler, notifications_handler, refresh_handler,
    upsert_document_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/monitoring", get(monitoring_handler))
        .route("/monitoring/refresh", post(refresh_handler))
        .route("/dashboard/stats", get(dashboard_stats_handler))
        .route("/students/:id/notifications", get(notifications_handler))
        .route("/metrics", get(metrics_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route(
            "/collections/:collection/documents/:id",
            put(upsert_document_handler).delete(delete_document_handler),
        )
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
