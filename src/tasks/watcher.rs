//! Change Watcher Task
//!
//! Background task that keeps the live view and cached dashboard data in
//! step with change notifications from the document source.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Collections;
use crate::dashboard::DashboardService;
use crate::models::resolve_relationship_id;
use crate::monitor::{channel_name, ChangeEvent, ChangeKind, DocumentSource, LiveMonitor};

/// Spawns the task reacting to change events on every monitored collection.
///
/// The subscription is taken before this returns, so no change made after
/// the call is missed. Aborting the returned handle drops the subscription.
///
/// # Reactions
/// - students, sessions, attempts, exams: invalidate dashboard stats and
///   rebuild the live view
/// - notifications: invalidate the addressed student's cached notifications
///   (all students for a broadcast or an update)
/// - lagged subscription: invalidate everything and rebuild
pub fn spawn_change_watcher(
    source: Arc<dyn DocumentSource>,
    monitor: LiveMonitor,
    dashboard: DashboardService,
    database_id: &str,
    collections: &Collections,
) -> JoinHandle<()> {
    let channels: Vec<String> = collections
        .all()
        .into_iter()
        .map(|collection| channel_name(database_id, collection))
        .collect();
    let mut subscription = source.subscribe(&channels);
    let collections = collections.clone();

    tokio::spawn(async move {
        info!(channels = channels.len(), "change watcher started");

        while let Some(event) = subscription.next().await {
            handle_change(&event, &monitor, &dashboard, &collections).await;
        }

        info!("change source closed, watcher stopping");
    })
}

async fn handle_change(
    event: &ChangeEvent,
    monitor: &LiveMonitor,
    dashboard: &DashboardService,
    collections: &Collections,
) {
    debug!(
        collection = %event.collection,
        document = %event.document_id,
        kind = ?event.kind,
        "change received"
    );

    if event.kind == ChangeKind::Resync {
        dashboard.invalidate_stats();
        dashboard.invalidate_all_notifications();
        monitor.refresh().await;
        return;
    }

    if event.collection == collections.notifications {
        // An update may have moved the notification away from its previous
        // student, whose id the event does not carry.
        if event.kind == ChangeKind::Update {
            dashboard.invalidate_all_notifications();
            return;
        }
        let student = event.payload.get("student").unwrap_or(&Value::Null);
        match resolve_relationship_id(student) {
            Some(student_id) => dashboard.invalidate_notifications(&student_id),
            None => dashboard.invalidate_all_notifications(),
        }
        return;
    }

    let affects_live_view = [
        &collections.students,
        &collections.sessions,
        &collections.attempts,
        &collections.exams,
    ]
    .contains(&&event.collection);

    if affects_live_view {
        dashboard.invalidate_stats();
        monitor.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::{json, Map};

    use crate::cache::TtlCache;
    use crate::dashboard::{notifications_key, DASHBOARD_STATS_KEY};
    use crate::metrics::MetricsRecorder;
    use crate::monitor::{LiveAggregator, LiveStatus, MemoryBackend};

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    struct Harness {
        backend: Arc<MemoryBackend>,
        monitor: LiveMonitor,
        dashboard: DashboardService,
        handle: JoinHandle<()>,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MemoryBackend::new("db"));
        let metrics = MetricsRecorder::default();
        let collections = Collections::default();
        let monitor = LiveMonitor::new(LiveAggregator::new(
            backend.clone(),
            metrics.clone(),
            collections.clone(),
        ));
        let dashboard = DashboardService::new(
            backend.clone(),
            TtlCache::default(),
            metrics,
            collections.clone(),
        );
        let handle = spawn_change_watcher(
            backend.clone(),
            monitor.clone(),
            dashboard.clone(),
            "db",
            &collections,
        );
        Harness {
            backend,
            monitor,
            dashboard,
            handle,
        }
    }

    /// Polls `check` until it holds or two seconds pass.
    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_session_change_rebuilds_view() {
        let h = harness();
        h.backend
            .upsert("students", "stu-1", object(json!({ "name": "Ada" })))
            .await;
        h.backend
            .upsert("sessions", "s1", object(json!({ "student": "stu-1", "isActive": true })))
            .await;

        let monitor = h.monitor.clone();
        let online = eventually(|| {
            let monitor = monitor.clone();
            async move {
                // Only the watcher refreshes here; the test never does.
                if monitor.applied_sequence().await.is_none() {
                    return false;
                }
                let view = monitor.current().await;
                view.entries
                    .first()
                    .is_some_and(|e| e.status == LiveStatus::IdleOnline)
            }
        })
        .await;

        assert!(online, "Watcher should have rebuilt the view");
        h.handle.abort();
    }

    /// Waits until the watcher has rebuilt the view at least once.
    async fn wait_for_rebuild(monitor: &LiveMonitor) {
        let rebuilt = eventually(|| {
            let monitor = monitor.clone();
            async move { monitor.applied_sequence().await.is_some() }
        })
        .await;
        assert!(rebuilt, "Watcher should have handled the student change");
    }

    #[tokio::test]
    async fn test_notification_change_invalidates_student_cache() {
        let h = harness();
        h.backend
            .upsert("students", "stu-1", object(json!({ "name": "Ada" })))
            .await;
        // The student change clears dashboard stats; let it land first.
        wait_for_rebuild(&h.monitor).await;

        h.dashboard.student_notifications("stu-1").await.unwrap();
        h.dashboard.dashboard_stats().await.unwrap();

        h.backend
            .upsert("notifications", "n1", object(json!({ "student": [{ "$id": "stu-1" }] })))
            .await;

        let cache = h.dashboard.cache().clone();
        let key = notifications_key("stu-1");
        let invalidated = eventually(|| {
            let cache = cache.clone();
            let key = key.clone();
            async move { !cache.has(&key) }
        })
        .await;

        assert!(invalidated);
        assert!(h.dashboard.cache().has(DASHBOARD_STATS_KEY));
        h.handle.abort();
    }

    #[tokio::test]
    async fn test_notification_reassignment_invalidates_previous_student() {
        let h = harness();
        h.backend
            .upsert("students", "stu-1", object(json!({ "name": "Ada" })))
            .await;
        h.backend
            .upsert("students", "stu-2", object(json!({ "name": "Ben" })))
            .await;
        h.backend
            .upsert("notifications", "n1", object(json!({ "student": "stu-1", "title": "Room 4" })))
            .await;
        wait_for_rebuild(&h.monitor).await;

        let cache = h.dashboard.cache().clone();
        let old_key = notifications_key("stu-1");

        // Earlier notification events may still be in flight; refill until
        // the cached entry sticks.
        let cached = eventually(|| {
            let dashboard = h.dashboard.clone();
            let cache = cache.clone();
            let old_key = old_key.clone();
            async move {
                dashboard.student_notifications("stu-1").await.unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
                cache.has(&old_key)
            }
        })
        .await;
        assert!(cached);
        assert_eq!(h.dashboard.student_notifications("stu-1").await.unwrap().len(), 1);

        h.backend
            .upsert("notifications", "n1", object(json!({ "student": "stu-2", "title": "Room 4" })))
            .await;

        let invalidated = eventually(|| {
            let cache = cache.clone();
            let old_key = old_key.clone();
            async move { !cache.has(&old_key) }
        })
        .await;
        assert!(invalidated, "Previous recipient must not keep a stale list");
        assert!(h.dashboard.student_notifications("stu-1").await.unwrap().is_empty());
        h.handle.abort();
    }

    #[tokio::test]
    async fn test_abort_unsubscribes() {
        let h = harness();
        assert_eq!(h.backend.subscriber_count(), 1);

        h.handle.abort();
        assert!(h.handle.await.unwrap_err().is_cancelled());
        assert_eq!(h.backend.subscriber_count(), 0);
    }
}
