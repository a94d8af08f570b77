//! Document and API models
//!
//! Typed backend documents, relationship normalization, and the DTOs used
//! for HTTP request and response bodies.

pub mod documents;
pub mod relation;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use documents::{Attempt, AttemptStatus, Exam, Notification, Session, Student};
pub use relation::{resolve_relationship_id, RelationRef};
pub use requests::{DocumentBody, DocumentPath};
pub use responses::{
    CacheStatsResponse, ClearResponse, DocumentResponse, HealthResponse, MetricsResponse,
};
