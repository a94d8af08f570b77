//! API Module
//!
//! HTTP handlers and routing for the monitoring service REST API.
//!
//! # Endpoints
//! - `GET /monitoring` - Current live status of every student
//! - `POST /monitoring/refresh` - Force a fresh fetch-and-join
//! - `GET /dashboard/stats` - Cached dashboard counters
//! - `GET /students/:id/notifications` - Cached notifications for a student
//! - `GET /metrics` - Per-operation timing summary
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache` - Drop every cached entry
//! - `PUT|DELETE /collections/:collection/documents/:id` - Document writes
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
