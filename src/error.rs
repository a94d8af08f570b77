//! Error types for the monitoring service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Monitor Error Enum ==
/// Unified error type for the monitoring service.
///
/// Cache misses and unmatched timers are not errors and never show up here.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Document or resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A backend fetch failed (transport or permission)
    #[error("Fetch from '{collection}' failed: {message}")]
    Fetch { collection: String, message: String },

    /// A backend fetch did not complete in time
    #[error("Fetch from '{collection}' timed out")]
    Timeout { collection: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    pub fn fetch(collection: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            collection: collection.into(),
            message: message.to_string(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MonitorError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            MonitorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            MonitorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the monitoring service.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MonitorError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MonitorError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (MonitorError::fetch("exams", "refused"), StatusCode::BAD_GATEWAY),
            (
                MonitorError::Timeout {
                    collection: "exams".into(),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (MonitorError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_fetch_message() {
        let error = MonitorError::fetch("sessions", "permission denied");
        assert_eq!(
            error.to_string(),
            "Fetch from 'sessions' failed: permission denied"
        );
    }
}
