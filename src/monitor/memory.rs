//! In-memory document backend
//!
//! A [`DocumentSource`] kept entirely in process. Writes publish change
//! events to every live subscription.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use crate::monitor::source::{
    channel_name, ChangeEvent, ChangeKind, DocumentList, DocumentSource, ListQuery, Subscription,
};

/// Key under which every stored document carries its id
pub const ID_KEY: &str = "$id";

const CHANGE_BUFFER: usize = 256;

/// Initial contents keyed by collection id.
pub type SeedData = HashMap<String, Vec<Value>>;

fn document_id(document: &Value) -> Option<&str> {
    document.get(ID_KEY).and_then(Value::as_str)
}

// == Memory Backend ==
#[derive(Debug)]
pub struct MemoryBackend {
    database_id: String,
    /// Documents per collection, in insertion order
    collections: RwLock<HashMap<String, Vec<Value>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryBackend {
    pub fn new(database_id: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            database_id: database_id.into(),
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Loads documents without publishing change events.
    ///
    /// Documents lacking a string `$id` are rejected.
    pub async fn seed(&self, data: SeedData) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let mut loaded = 0;

        for (collection, documents) in data {
            if let Some(bad) = documents.iter().position(|d| document_id(d).is_none()) {
                return Err(MonitorError::InvalidRequest(format!(
                    "Seed document {} in '{}' has no {}",
                    bad, collection, ID_KEY
                )));
            }
            loaded += documents.len();
            collections.entry(collection).or_default().extend(documents);
        }

        info!(documents = loaded, "memory backend seeded");
        Ok(loaded)
    }

    // == Upsert ==
    /// Inserts or replaces a document and publishes the change.
    pub async fn upsert(
        &self,
        collection: &str,
        id: &str,
        mut body: Map<String, Value>,
    ) -> ChangeKind {
        body.remove("id");
        body.insert(ID_KEY.to_string(), Value::String(id.to_string()));
        let document = Value::Object(body);

        let kind = {
            let mut collections = self.collections.write().await;
            let documents = collections.entry(collection.to_string()).or_default();
            match documents.iter_mut().find(|d| document_id(d) == Some(id)) {
                Some(existing) => {
                    *existing = document.clone();
                    ChangeKind::Update
                }
                None => {
                    documents.push(document.clone());
                    ChangeKind::Create
                }
            }
        };

        self.publish(collection, id, kind, document);
        kind
    }

    // == Delete ==
    /// Removes a document and publishes the change.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = {
            let mut collections = self.collections.write().await;
            let documents = collections
                .get_mut(collection)
                .ok_or_else(|| MonitorError::NotFound(format!("Collection '{}'", collection)))?;
            let index = documents
                .iter()
                .position(|d| document_id(d) == Some(id))
                .ok_or_else(|| MonitorError::NotFound(format!("Document '{}'", id)))?;
            documents.remove(index)
        };

        self.publish(collection, id, ChangeKind::Delete, removed);
        Ok(())
    }

    fn publish(&self, collection: &str, id: &str, kind: ChangeKind, payload: Value) {
        let event = ChangeEvent {
            channel: channel_name(&self.database_id, collection),
            collection: collection.to_string(),
            document_id: id.to_string(),
            kind,
            payload,
        };
        // No receivers is fine: nobody is watching yet.
        let receivers = self.changes.send(event).unwrap_or(0);
        debug!(collection, id, ?kind, receivers, "change published");
    }
}

#[async_trait]
impl DocumentSource for MemoryBackend {
    async fn list_documents(&self, collection: &str, query: &ListQuery) -> Result<DocumentList> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(DocumentList::default());
        };

        let matching: Vec<&Value> = documents.iter().filter(|d| query.matches(d)).collect();
        Ok(DocumentList {
            total: matching.len(),
            documents: matching.into_iter().take(query.limit).cloned().collect(),
        })
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| document_id(d) == Some(id)))
            .cloned()
            .ok_or_else(|| MonitorError::NotFound(format!("Document '{}' in '{}'", id, collection)))
    }

    fn subscribe(&self, channels: &[String]) -> Subscription {
        Subscription::new(channels, self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::source::Filter;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_list_and_get() {
        let backend = MemoryBackend::new("db");

        let kind = backend
            .upsert("sessions", "s1", object(json!({ "isActive": true })))
            .await;
        assert_eq!(kind, ChangeKind::Create);

        let kind = backend
            .upsert("sessions", "s1", object(json!({ "isActive": false })))
            .await;
        assert_eq!(kind, ChangeKind::Update);

        let list = backend
            .list_documents("sessions", &ListQuery::new(10))
            .await
            .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.documents[0]["isActive"], json!(false));

        let doc = backend.get_document("sessions", "s1").await.unwrap();
        assert_eq!(doc[ID_KEY], json!("s1"));
    }

    #[tokio::test]
    async fn test_list_applies_limit_and_filters() {
        let backend = MemoryBackend::new("db");
        for i in 0..5 {
            backend
                .upsert("attempts", &format!("a{i}"), object(json!({ "status": "started" })))
                .await;
        }
        backend
            .upsert("attempts", "done", object(json!({ "status": "completed" })))
            .await;

        let query = ListQuery::new(2).filter(Filter::equal("status", "started"));
        let list = backend.list_documents("attempts", &query).await.unwrap();

        assert_eq!(list.total, 5);
        assert_eq!(list.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let backend = MemoryBackend::new("db");
        let list = backend
            .list_documents("nothing", &ListQuery::new(10))
            .await
            .unwrap();
        assert_eq!(list, DocumentList::default());

        let missing = backend.get_document("nothing", "x").await;
        assert!(matches!(missing, Err(MonitorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let backend = MemoryBackend::new("db");
        let mut subscription = backend.subscribe(&[channel_name("db", "sessions")]);

        backend
            .upsert("sessions", "s1", object(json!({ "student": "stu-1" })))
            .await;
        backend.delete("sessions", "s1").await.unwrap();

        let created = subscription.next().await.unwrap();
        assert_eq!(created.kind, ChangeKind::Create);
        assert_eq!(created.collection, "sessions");

        let deleted = subscription.next().await.unwrap();
        assert_eq!(deleted.kind, ChangeKind::Delete);
        assert_eq!(deleted.payload["student"], json!("stu-1"));
    }

    #[tokio::test]
    async fn test_changes_use_backend_database_channel() {
        let backend = MemoryBackend::new("exam_portal");
        let mut ours = backend.subscribe(&[channel_name(backend.database_id(), "exams")]);
        let mut other = backend.subscribe(&[channel_name("other_db", "exams")]);

        backend.upsert("exams", "e1", object(json!({ "title": "Algebra" }))).await;

        let event = ours.next().await.unwrap();
        assert_eq!(event.channel, "databases.exam_portal.collections.exams.documents");

        drop(backend);
        assert!(other.next().await.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_document() {
        let backend = MemoryBackend::new("db");
        let result = backend.delete("sessions", "ghost").await;
        assert!(matches!(result, Err(MonitorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_seed_requires_ids() {
        let backend = MemoryBackend::new("db");

        let good = SeedData::from([("exams".to_string(), vec![json!({ "$id": "e1" })])]);
        assert_eq!(backend.seed(good).await.unwrap(), 1);

        let bad = SeedData::from([("exams".to_string(), vec![json!({ "title": "x" })])]);
        assert!(backend.seed(bad).await.is_err());
    }
}
