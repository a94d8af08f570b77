//! Document models
//!
//! Typed views over the backend collections the monitor reads. Foreign keys
//! are normalized to plain ids while deserializing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::relation::deserialize_relation;

/// A student identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A login session; only active sessions count as online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "student", default, deserialize_with = "deserialize_relation")]
    pub student_id: Option<String>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "lastActivity", default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Lifecycle state of an exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Started,
    InProgress,
    Completed,
    Submitted,
    #[serde(other)]
    Other,
}

impl AttemptStatus {
    /// `started` and `in_progress` attempts put a student in an exam.
    pub fn is_in_progress(self) -> bool {
        matches!(self, AttemptStatus::Started | AttemptStatus::InProgress)
    }
}

/// A student's attempt at an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "student", default, deserialize_with = "deserialize_relation")]
    pub student_id: Option<String>,
    #[serde(rename = "exam", default, deserialize_with = "deserialize_relation")]
    pub exam_id: Option<String>,
    pub status: AttemptStatus,
    #[serde(rename = "startedAt", default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Duration in minutes
    #[serde(default)]
    pub duration: Option<u32>,
}

/// A notification addressed to one student, or to everyone when `student_id` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "student", default, deserialize_with = "deserialize_relation")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "createdAt", alias = "$createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_visible_to(&self, student_id: &str) -> bool {
        match &self.student_id {
            Some(target) => target == student_id,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_from_backend_document() {
        let session: Session = serde_json::from_value(json!({
            "$id": "sess-1",
            "student": [{ "$id": "stu-1", "name": "Ada" }],
            "isActive": true,
            "lastActivity": "2026-10-16T09:30:00Z"
        }))
        .unwrap();

        assert_eq!(session.id, "sess-1");
        assert_eq!(session.student_id.as_deref(), Some("stu-1"));
        assert!(session.is_active);
        assert!(session.last_activity.is_some());
    }

    #[test]
    fn test_attempt_status_parsing() {
        let attempt: Attempt = serde_json::from_value(json!({
            "$id": "att-1",
            "student": "stu-1",
            "exam": { "$id": "exam-1" },
            "status": "in_progress"
        }))
        .unwrap();

        assert_eq!(attempt.exam_id.as_deref(), Some("exam-1"));
        assert!(attempt.status.is_in_progress());

        let other: AttemptStatus = serde_json::from_value(json!("abandoned")).unwrap();
        assert_eq!(other, AttemptStatus::Other);
        assert!(!other.is_in_progress());
        assert!(!AttemptStatus::Completed.is_in_progress());
    }

    #[test]
    fn test_session_defaults_to_inactive() {
        let session: Session = serde_json::from_value(json!({ "$id": "s" })).unwrap();
        assert!(!session.is_active);
        assert!(session.student_id.is_none());
    }

    #[test]
    fn test_notification_visibility() {
        let direct: Notification =
            serde_json::from_value(json!({ "$id": "n1", "student": "stu-1" })).unwrap();
        let broadcast: Notification = serde_json::from_value(json!({ "$id": "n2" })).unwrap();

        assert!(direct.is_visible_to("stu-1"));
        assert!(!direct.is_visible_to("stu-2"));
        assert!(broadcast.is_visible_to("stu-2"));
    }

    #[test]
    fn test_backend_id_wins_over_plain_id() {
        let student: Student = serde_json::from_value(json!({
            "$id": "stu-1",
            "id": "legacy-7",
            "name": "Ada"
        }))
        .unwrap();
        assert_eq!(student.id, "stu-1");

        let attempt: Attempt = serde_json::from_value(json!({
            "$id": "att-1",
            "id": "att-1",
            "student": { "$id": "stu-1", "id": "stu-1" },
            "status": "started"
        }))
        .unwrap();
        assert_eq!(attempt.student_id.as_deref(), Some("stu-1"));
    }

    #[test]
    fn test_notification_survives_serialize_round_trip() {
        let original: Notification = serde_json::from_value(json!({
            "$id": "n1",
            "student": [{ "$id": "stu-1" }],
            "title": "Room change",
            "createdAt": "2026-10-16T08:00:00Z"
        }))
        .unwrap();

        let back: Notification =
            serde_json::from_value(serde_json::to_value(&original).unwrap()).unwrap();
        assert_eq!(back, original);
    }
}
