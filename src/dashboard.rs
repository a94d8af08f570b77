//! Dashboard Service
//!
//! Read-through cached views for the admin dashboard and student portal.
//! Aggregate totals change slowly and are kept five minutes; notifications
//! are kept two minutes. The change watcher invalidates entries early.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{TtlCache, FREQUENT_TTL, SLOW_CHANGING_TTL};
use crate::config::{Collections, Config};
use crate::error::{MonitorError, Result};
use crate::metrics::MetricsRecorder;
use crate::models::Notification;
use crate::monitor::aggregator::decode_documents;
use crate::monitor::source::{timed_get, timed_list, DocumentSource, Filter, ListQuery};
use crate::monitor::{DEFAULT_FETCH_TIMEOUT, DEFAULT_PAGE_LIMIT};

/// Cache key for the dashboard totals
pub const DASHBOARD_STATS_KEY: &str = "dashboard_stats";

const NOTIFICATIONS_KEY_PREFIX: &str = "student_notifications_";

/// Cache key for one student's notifications.
pub fn notifications_key(student_id: &str) -> String {
    format!("{NOTIFICATIONS_KEY_PREFIX}{student_id}")
}

/// Totals shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_exams: usize,
    pub active_sessions: usize,
    pub in_progress_attempts: usize,
    pub generated_at: DateTime<Utc>,
}

fn to_cached<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| MonitorError::Internal(e.to_string()))
}

fn from_cached<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| MonitorError::Internal(e.to_string()))
}

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn DocumentSource>,
    cache: TtlCache<Value>,
    metrics: MetricsRecorder,
    collections: Collections,
    page_limit: usize,
    fetch_timeout: Duration,
}

impl DashboardService {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        cache: TtlCache<Value>,
        metrics: MetricsRecorder,
        collections: Collections,
    ) -> Self {
        Self {
            source,
            cache,
            metrics,
            collections,
            page_limit: DEFAULT_PAGE_LIMIT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn from_config(
        source: Arc<dyn DocumentSource>,
        cache: TtlCache<Value>,
        metrics: MetricsRecorder,
        config: &Config,
    ) -> Self {
        Self {
            page_limit: config.page_limit,
            fetch_timeout: config.fetch_timeout(),
            ..Self::new(source, cache, metrics, config.collections.clone())
        }
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    async fn count(&self, collection: &str, query: ListQuery) -> Result<usize> {
        let list = timed_list(
            self.source.as_ref(),
            &self.metrics,
            collection,
            &query,
            self.fetch_timeout,
        )
        .await?;
        Ok(list.total)
    }

    async fn compute_stats(&self) -> Result<DashboardStats> {
        let c = &self.collections;
        let (total_students, total_exams, active_sessions, in_progress_attempts) = tokio::try_join!(
            self.count(&c.students, ListQuery::new(1)),
            self.count(&c.exams, ListQuery::new(1)),
            self.count(
                &c.sessions,
                ListQuery::new(1).filter(Filter::equal("isActive", true))
            ),
            self.count(
                &c.attempts,
                ListQuery::new(1).filter(Filter::one_of("status", ["started", "in_progress"]))
            ),
        )?;

        Ok(DashboardStats {
            total_students,
            total_exams,
            active_sessions,
            in_progress_attempts,
            generated_at: Utc::now(),
        })
    }

    // == Dashboard Stats ==
    /// Aggregate totals, cached for five minutes.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let cached = self
            .cache
            .get_or_fetch(DASHBOARD_STATS_KEY, Some(SLOW_CHANGING_TTL), || async {
                to_cached(&self.compute_stats().await?)
            })
            .await?;
        from_cached(cached)
    }

    async fn load_notifications(&self, student_id: &str) -> Result<Vec<Notification>> {
        // Unknown students are a 404, not an empty list.
        timed_get(
            self.source.as_ref(),
            &self.metrics,
            &self.collections.students,
            student_id,
            self.fetch_timeout,
        )
        .await?;

        let list = timed_list(
            self.source.as_ref(),
            &self.metrics,
            &self.collections.notifications,
            &ListQuery::new(self.page_limit),
            self.fetch_timeout,
        )
        .await?;

        let mut notifications: Vec<Notification> =
            decode_documents(&self.collections.notifications, list.documents)
                .into_iter()
                .filter(|n: &Notification| n.is_visible_to(student_id))
                .collect();
        // Newest first; undated last.
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    // == Student Notifications ==
    /// Notifications for one student (direct and broadcast), cached for two minutes.
    pub async fn student_notifications(&self, student_id: &str) -> Result<Vec<Notification>> {
        let key = notifications_key(student_id);
        let cached = self
            .cache
            .get_or_fetch(&key, Some(FREQUENT_TTL), || async {
                to_cached(&self.load_notifications(student_id).await?)
            })
            .await?;
        from_cached(cached)
    }

    // == Invalidation ==
    pub fn invalidate_stats(&self) {
        if self.cache.delete(DASHBOARD_STATS_KEY) {
            debug!("dashboard stats invalidated");
        }
    }

    pub fn invalidate_notifications(&self, student_id: &str) {
        if self.cache.delete(&notifications_key(student_id)) {
            debug!(student = student_id, "notifications invalidated");
        }
    }

    /// Drops every student's cached notifications.
    pub fn invalidate_all_notifications(&self) {
        let removed = self
            .cache
            .delete_matching(|key| key.starts_with(NOTIFICATIONS_KEY_PREFIX));
        debug!(removed, "all notifications invalidated");
    }
}
