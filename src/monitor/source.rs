//! Document source abstraction
//!
//! The monitor reads every collection through [`DocumentSource`], so the
//! backing store can be swapped without touching the aggregation logic.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::metrics::MetricsRecorder;

/// Channel name for change events of one collection.
pub fn channel_name(database_id: &str, collection: &str) -> String {
    format!("databases.{database_id}.collections.{collection}.documents")
}

// == Queries ==
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the given value
    Equal { field: String, value: Value },
    /// Field equals any of the given values
    In { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equal {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Equal { field, value } => document.get(field) == Some(value),
            Filter::In { field, values } => document
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
        }
    }
}

/// Page-limited list query. There is no cursor: callers see at most `limit` documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: usize,
    pub filters: Vec<Filter>,
}

impl ListQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }
}

/// One page of documents plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentList {
    pub documents: Vec<Value>,
    pub total: usize,
}

// == Change Events ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    /// Events were dropped; consumers should treat everything as changed
    Resync,
}

impl ChangeKind {
    pub fn past_tense(self) -> &'static str {
        match self {
            ChangeKind::Create => "created",
            ChangeKind::Update => "updated",
            ChangeKind::Delete => "deleted",
            ChangeKind::Resync => "resynced",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub channel: String,
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
    /// Document after the change, or the removed document for deletes
    pub payload: Value,
}

impl ChangeEvent {
    fn resync() -> Self {
        Self {
            channel: String::new(),
            collection: String::new(),
            document_id: String::new(),
            kind: ChangeKind::Resync,
            payload: Value::Null,
        }
    }
}

/// Receives change events for a fixed set of channels.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    channels: HashSet<String>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(channels: &[String], receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            channels: channels.iter().cloned().collect(),
            receiver,
        }
    }

    /// Next event on a subscribed channel; `None` once the source is gone.
    ///
    /// If the subscriber fell behind, a single `Resync` event stands in for
    /// everything that was skipped.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.channels.contains(&event.channel) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscription lagged, requesting resync");
                    return Some(ChangeEvent::resync());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// == Document Source ==
/// Backend collaborator: list, single fetch, and change subscription.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Lists up to `query.limit` documents matching `query`.
    async fn list_documents(&self, collection: &str, query: &ListQuery) -> Result<DocumentList>;

    /// Fetches one document by id.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Value>;

    /// Subscribes to change events on `channels`.
    fn subscribe(&self, channels: &[String]) -> Subscription;
}

/// Lists a collection under a timeout, timing the call as `list_{collection}`.
pub async fn timed_list(
    source: &dyn DocumentSource,
    metrics: &MetricsRecorder,
    collection: &str,
    query: &ListQuery,
    timeout: Duration,
) -> Result<DocumentList> {
    let operation = format!("list_{collection}");
    let fetch = tokio::time::timeout(timeout, source.list_documents(collection, query));

    match metrics.measure(&operation, fetch).await {
        Ok(Ok(list)) => {
            if list.total > list.documents.len() {
                debug!(
                    collection,
                    fetched = list.documents.len(),
                    total = list.total,
                    "collection truncated at page limit"
                );
            }
            Ok(list)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(MonitorError::Timeout {
            collection: collection.to_string(),
        }),
    }
}

/// Fetches one document under a timeout, timing the call as `get_{collection}`.
pub async fn timed_get(
    source: &dyn DocumentSource,
    metrics: &MetricsRecorder,
    collection: &str,
    id: &str,
    timeout: Duration,
) -> Result<Value> {
    let operation = format!("get_{collection}");
    let fetch = tokio::time::timeout(timeout, source.get_document(collection, id));

    metrics
        .measure(&operation, fetch)
        .await
        .unwrap_or_else(|_| {
            Err(MonitorError::Timeout {
                collection: collection.to_string(),
            })
        })
}
