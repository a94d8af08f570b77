//! Request DTOs for the monitoring API
//!
//! Defines path parameters and bodies of incoming requests.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum length accepted for collection and document ids
pub const MAX_ID_LENGTH: usize = 256;

/// Path parameters for document writes (`/collections/:collection/documents/:id`)
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    /// Validates the path parameters
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.collection.is_empty() || self.id.is_empty() {
            return Some("Collection and document id cannot be empty".to_string());
        }
        if self.collection.len() > MAX_ID_LENGTH || self.id.len() > MAX_ID_LENGTH {
            return Some(format!(
                "Identifiers exceed maximum length of {} characters",
                MAX_ID_LENGTH
            ));
        }
        // Channel names are dot-separated
        if self.collection.contains('.') {
            return Some("Collection id cannot contain '.'".to_string());
        }
        None
    }
}

/// Body of a document upsert: any JSON object.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DocumentBody(pub Map<String, Value>);
