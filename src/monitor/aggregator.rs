//! Live Aggregator
//!
//! Joins students, sessions, attempts and exams into one status record per
//! student. Every run is a full recompute from freshly fetched collections.
//! A source that fails or times out contributes an empty set; the join
//! still runs and the failure is reported alongside the result.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Collections, Config};
use crate::error::Result;
use crate::metrics::MetricsRecorder;
use crate::models::{Attempt, Exam, Session, Student};
use crate::monitor::source::{timed_list, DocumentSource, ListQuery};

/// Placeholder shown for references that could not be resolved
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Default number of documents fetched per collection
pub const DEFAULT_PAGE_LIMIT: usize = 5000;

/// Default caller-side timeout for each collection fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// == View Types ==
/// Derived status; each student has exactly one at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    InExam,
    IdleOnline,
    Offline,
}

impl LiveStatus {
    pub fn is_online(self) -> bool {
        !matches!(self, LiveStatus::Offline)
    }
}

/// An in-progress attempt with its exam, if the exam could be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptView {
    pub attempt: Attempt,
    pub exam: Option<Exam>,
    /// Exam title, or [`UNKNOWN_LABEL`]
    pub exam_title: String,
}

impl AttemptView {
    fn new(attempt: Attempt, exam: Option<Exam>) -> Self {
        let exam_title = exam
            .as_ref()
            .map(|e| e.title.clone())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        Self {
            attempt,
            exam,
            exam_title,
        }
    }

    pub fn is_exam_resolved(&self) -> bool {
        self.exam.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStatus {
    pub student: Student,
    pub status: LiveStatus,
    pub session: Option<Session>,
    pub attempt: Option<AttemptView>,
}

impl StudentStatus {
    fn new(student: Student, session: Option<Session>, attempt: Option<AttemptView>) -> Self {
        let status = if attempt.is_some() {
            LiveStatus::InExam
        } else if session.is_some() {
            LiveStatus::IdleOnline
        } else {
            LiveStatus::Offline
        };
        Self {
            student,
            status,
            session,
            attempt,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiveCounts {
    pub total: usize,
    pub online: usize,
    pub in_exam: usize,
    pub idle: usize,
    pub offline: usize,
}

impl LiveCounts {
    fn tally(entries: &[StudentStatus]) -> Self {
        let mut counts = LiveCounts {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.status {
                LiveStatus::InExam => counts.in_exam += 1,
                LiveStatus::IdleOnline => counts.idle += 1,
                LiveStatus::Offline => counts.offline += 1,
            }
        }
        counts.online = counts.in_exam + counts.idle;
        counts
    }
}

/// A source collection that could not be fetched for this view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub collection: String,
    pub error: String,
}

/// The joined live view handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveView {
    /// Online students first, then by name
    pub entries: Vec<StudentStatus>,
    pub counts: LiveCounts,
    /// Dangling student or exam references encountered during the join
    pub unresolved_references: usize,
    pub source_failures: Vec<SourceFailure>,
    pub generated_at: DateTime<Utc>,
    /// Assigned by the monitor; 0 for a view built outside it
    pub sequence: u64,
}

impl LiveView {
    pub fn is_partial(&self) -> bool {
        !self.source_failures.is_empty()
    }
}

// == Join ==
/// Result of joining already-fetched collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub entries: Vec<StudentStatus>,
    pub unresolved_references: usize,
}

/// Joins the four collections into one ordered status list.
///
/// Sessions count only when active and attempts only while started or in
/// progress. References to unknown students or exams are logged and
/// counted, never fatal. The first active session (or in-progress attempt)
/// per student wins.
pub fn join_live_status(
    students: Vec<Student>,
    sessions: Vec<Session>,
    attempts: Vec<Attempt>,
    exams: Vec<Exam>,
) -> Joined {
    let student_ids: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let exams_by_id: HashMap<&str, &Exam> = exams.iter().map(|e| (e.id.as_str(), e)).collect();
    let mut unresolved = 0;

    let mut session_by_student: HashMap<String, Session> = HashMap::new();
    for session in sessions.into_iter().filter(|s| s.is_active) {
        let Some(student_id) = session.student_id.clone() else {
            warn!(session = %session.id, "active session has no student reference");
            unresolved += 1;
            continue;
        };
        if !student_ids.contains(student_id.as_str()) {
            warn!(session = %session.id, student = %student_id, "active session references unknown student");
            unresolved += 1;
            continue;
        }
        match session_by_student.entry(student_id) {
            Entry::Occupied(existing) => {
                debug!(student = %existing.key(), session = %session.id, "duplicate active session ignored");
            }
            Entry::Vacant(slot) => {
                slot.insert(session);
            }
        }
    }

    let mut attempt_by_student: HashMap<String, Attempt> = HashMap::new();
    for attempt in attempts.into_iter().filter(|a| a.status.is_in_progress()) {
        let Some(student_id) = attempt.student_id.clone() else {
            warn!(attempt = %attempt.id, "in-progress attempt has no student reference");
            unresolved += 1;
            continue;
        };
        if !student_ids.contains(student_id.as_str()) {
            warn!(attempt = %attempt.id, student = %student_id, "in-progress attempt references unknown student");
            unresolved += 1;
            continue;
        }
        match attempt_by_student.entry(student_id) {
            Entry::Occupied(existing) => {
                debug!(student = %existing.key(), attempt = %attempt.id, "duplicate in-progress attempt ignored");
            }
            Entry::Vacant(slot) => {
                slot.insert(attempt);
            }
        }
    }

    let mut entries = Vec::with_capacity(students.len());
    for student in students.iter() {
        let session = session_by_student.remove(&student.id);
        let attempt = attempt_by_student.remove(&student.id).map(|attempt| {
            let exam = attempt
                .exam_id
                .as_deref()
                .and_then(|id| exams_by_id.get(id))
                .map(|exam| (*exam).clone());
            if exam.is_none() {
                warn!(
                    attempt = %attempt.id,
                    exam = attempt.exam_id.as_deref().unwrap_or("<none>"),
                    "attempt references unknown exam"
                );
                unresolved += 1;
            }
            AttemptView::new(attempt, exam)
        });
        entries.push(StudentStatus::new(student.clone(), session, attempt));
    }

    // Stable: equal keys keep input order.
    entries.sort_by_cached_key(|entry| (!entry.is_online(), entry.student.name.to_lowercase()));

    Joined {
        entries,
        unresolved_references: unresolved,
    }
}

// == Live Aggregator ==
/// Fetches the source collections and joins them.
pub struct LiveAggregator {
    source: Arc<dyn DocumentSource>,
    metrics: MetricsRecorder,
    collections: Collections,
    page_limit: usize,
    fetch_timeout: Duration,
}

impl LiveAggregator {
    pub fn new(source: Arc<dyn DocumentSource>, metrics: MetricsRecorder, collections: Collections) -> Self {
        Self {
            source,
            metrics,
            collections,
            page_limit: DEFAULT_PAGE_LIMIT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Builds an aggregator with the configured collections, page limit and timeout.
    pub fn from_config(source: Arc<dyn DocumentSource>, metrics: MetricsRecorder, config: &Config) -> Self {
        Self::new(source, metrics, config.collections.clone())
            .with_page_limit(config.page_limit)
            .with_fetch_timeout(config.fetch_timeout())
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let query = ListQuery::new(self.page_limit);
        let list = timed_list(
            self.source.as_ref(),
            &self.metrics,
            collection,
            &query,
            self.fetch_timeout,
        )
        .await?;
        Ok(decode_documents(collection, list.documents))
    }

    // == Fetch And Join ==
    /// Fetches all sources concurrently and joins them into a fresh view.
    ///
    /// Never fails: each failed source is replaced by an empty set and
    /// listed in `source_failures`.
    pub async fn fetch_and_join(&self) -> LiveView {
        let c = &self.collections;
        let (students, sessions, attempts, exams) = self
            .metrics
            .measure("fetch_and_join", async {
                tokio::join!(
                    self.fetch::<Student>(&c.students),
                    self.fetch::<Session>(&c.sessions),
                    self.fetch::<Attempt>(&c.attempts),
                    self.fetch::<Exam>(&c.exams),
                )
            })
            .await;

        let mut failures = Vec::new();
        let students = or_empty(&c.students, students, &mut failures);
        let sessions = or_empty(&c.sessions, sessions, &mut failures);
        let attempts = or_empty(&c.attempts, attempts, &mut failures);
        let exams = or_empty(&c.exams, exams, &mut failures);

        let joined = join_live_status(students, sessions, attempts, exams);
        let counts = LiveCounts::tally(&joined.entries);
        info!(
            total = counts.total,
            online = counts.online,
            in_exam = counts.in_exam,
            unresolved = joined.unresolved_references,
            failed_sources = failures.len(),
            "live view rebuilt"
        );

        LiveView {
            entries: joined.entries,
            counts,
            unresolved_references: joined.unresolved_references,
            source_failures: failures,
            generated_at: Utc::now(),
            sequence: 0,
        }
    }
}

fn or_empty<T>(collection: &str, result: Result<Vec<T>>, failures: &mut Vec<SourceFailure>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(collection, error = %e, "source fetch failed, continuing with empty set");
            failures.push(SourceFailure {
                collection: collection.to_string(),
                error: e.to_string(),
            });
            Vec::new()
        }
    }
}

/// Deserializes documents, skipping (and logging) any that do not fit `T`.
pub fn decode_documents<T: DeserializeOwned>(collection: &str, documents: Vec<Value>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document
                .get("$id")
                .and_then(Value::as_str)
                .unwrap_or("<no id>")
                .to_string();
            match serde_json::from_value(document) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(collection, document = %id, error = %e, "skipping malformed document");
                    None
                }
            }
        })
        .collect()
}
