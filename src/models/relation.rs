//! Relationship resolution
//!
//! Document stores return foreign keys in several shapes: a bare id, an
//! array whose first element is an id or an embedded document, or an embedded
//! document carrying `$id`. Everything is normalized to a plain id here, at
//! deserialization time.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Raw shape of a foreign-key field as it arrives from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RelationRef {
    Id(String),
    Many(Vec<RelationRef>),
    /// `$id` is canonical; a plain `id` is only a fallback.
    Embedded {
        #[serde(rename = "$id", default)]
        canonical: Option<String>,
        #[serde(default)]
        id: Option<String>,
    },
    Unrecognized(IgnoredAny),
}

impl RelationRef {
    /// Canonical id, or `None` when the shape carries no usable id.
    pub fn into_id(self) -> Option<String> {
        match self {
            RelationRef::Id(id) => Some(id).filter(|id| !id.is_empty()),
            RelationRef::Embedded { canonical, id } => canonical
                .filter(|id| !id.is_empty())
                .or(id)
                .filter(|id| !id.is_empty()),
            RelationRef::Many(items) => items.into_iter().next().and_then(RelationRef::into_id),
            RelationRef::Unrecognized(_) => None,
        }
    }
}

/// Normalizes a foreign-key field of unknown shape to a single id.
///
/// `null`, `[]` and shapes without an id all yield `None`.
pub fn resolve_relationship_id(field: &Value) -> Option<String> {
    RelationRef::deserialize(field)
        .ok()
        .and_then(RelationRef::into_id)
}

/// `deserialize_with` adapter for optional relationship fields.
pub fn deserialize_relation<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RelationRef>::deserialize(deserializer).map(|r| r.and_then(RelationRef::into_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_three_shapes_resolve_to_same_id() {
        let expected = Some("abc123".to_string());
        assert_eq!(resolve_relationship_id(&json!("abc123")), expected);
        assert_eq!(resolve_relationship_id(&json!(["abc123"])), expected);
        assert_eq!(resolve_relationship_id(&json!({ "$id": "abc123" })), expected);
    }

    #[test]
    fn test_array_of_embedded_documents() {
        let field = json!([{ "$id": "exam-1", "title": "Algebra" }, { "$id": "exam-2" }]);
        assert_eq!(resolve_relationship_id(&field), Some("exam-1".to_string()));
    }

    #[test]
    fn test_embedded_document_with_extra_fields() {
        let field = json!({ "$id": "s-9", "name": "Ada", "$collectionId": "students" });
        assert_eq!(resolve_relationship_id(&field), Some("s-9".to_string()));
    }

    #[test]
    fn test_embedded_document_with_both_id_keys() {
        let field = json!({ "$id": "abc", "id": "abc" });
        assert_eq!(resolve_relationship_id(&field), Some("abc".to_string()));

        let field = json!([{ "id": "legacy", "$id": "canonical" }]);
        assert_eq!(resolve_relationship_id(&field), Some("canonical".to_string()));

        assert_eq!(resolve_relationship_id(&json!({ "id": "plain" })), Some("plain".to_string()));
    }

    #[test]
    fn test_empty_shapes_resolve_to_none() {
        assert_eq!(resolve_relationship_id(&Value::Null), None);
        assert_eq!(resolve_relationship_id(&json!([])), None);
        assert_eq!(resolve_relationship_id(&json!("")), None);
        assert_eq!(resolve_relationship_id(&json!({ "name": "no id" })), None);
        assert_eq!(resolve_relationship_id(&json!(42)), None);
    }

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_relation")]
        student: Option<String>,
    }

    #[test]
    fn test_field_adapter_handles_missing_and_null() {
        let missing: Holder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.student, None);

        let null: Holder = serde_json::from_value(json!({ "student": null })).unwrap();
        assert_eq!(null.student, None);

        let wrapped: Holder = serde_json::from_value(json!({ "student": [{ "$id": "s1" }] })).unwrap();
        assert_eq!(wrapped.student, Some("s1".to_string()));
    }

    proptest! {
        // Wrapping an id in any supported shape never changes the result.
        #[test]
        fn prop_shapes_are_equivalent(id in "[a-z0-9]{1,20}") {
            let scalar = resolve_relationship_id(&json!(id));
            prop_assert_eq!(scalar.as_deref(), Some(id.as_str()));
            prop_assert_eq!(resolve_relationship_id(&json!([id])), scalar.clone());
            prop_assert_eq!(resolve_relationship_id(&json!({ "$id": id })), scalar.clone());
            prop_assert_eq!(resolve_relationship_id(&json!([{ "$id": id }])), scalar);
        }
    }
}
