//! Configuration Module
//!
//! Handles loading service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Collection identifiers inside the document database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub students: String,
    pub sessions: String,
    pub attempts: String,
    pub exams: String,
    pub notifications: String,
}

impl Collections {
    /// Every collection id, in a fixed order.
    pub fn all(&self) -> [&str; 5] {
        [
            &self.students,
            &self.sessions,
            &self.attempts,
            &self.exams,
            &self.notifications,
        ]
    }
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            students: "students".to_string(),
            sessions: "sessions".to_string(),
            attempts: "attempts".to_string(),
            exams: "exams".to_string(),
            notifications: "notifications".to_string(),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database identifier used in change-channel names
    pub database_id: String,
    /// Collection identifiers
    pub collections: Collections,
    /// Default cache TTL in seconds
    pub default_ttl: u64,
    /// Maximum documents fetched per collection
    pub page_limit: usize,
    /// Per-collection fetch timeout in seconds
    pub fetch_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Optional JSON file used to seed the in-memory backend
    pub seed_file: Option<PathBuf>,
    /// Interval in seconds for logging the metrics summary, 0 disables it
    pub metrics_log_interval: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_ID` (default: exam_portal)
    /// - `STUDENTS_COLLECTION_ID`, `SESSIONS_COLLECTION_ID`, `ATTEMPTS_COLLECTION_ID`,
    ///   `EXAMS_COLLECTION_ID`, `NOTIFICATIONS_COLLECTION_ID` (default: collection name)
    /// - `DEFAULT_TTL` - Default cache TTL in seconds (default: 300)
    /// - `PAGE_LIMIT` - Documents fetched per collection (default: 5000)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SEED_FILE` - JSON seed for the in-memory backend (default: unset)
    /// - `METRICS_LOG_INTERVAL` - Seconds between summary logs (default: 0, off)
    pub fn from_env() -> Self {
        let defaults = Collections::default();
        Self {
            database_id: env_string("DATABASE_ID", "exam_portal"),
            collections: Collections {
                students: env_string("STUDENTS_COLLECTION_ID", &defaults.students),
                sessions: env_string("SESSIONS_COLLECTION_ID", &defaults.sessions),
                attempts: env_string("ATTEMPTS_COLLECTION_ID", &defaults.attempts),
                exams: env_string("EXAMS_COLLECTION_ID", &defaults.exams),
                notifications: env_string("NOTIFICATIONS_COLLECTION_ID", &defaults.notifications),
            },
            default_ttl: env_or("DEFAULT_TTL", 300),
            page_limit: env_or("PAGE_LIMIT", 5000),
            fetch_timeout: env_or("FETCH_TIMEOUT", 10),
            server_port: env_or("SERVER_PORT", 3000),
            seed_file: env::var("SEED_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            metrics_log_interval: env_or("METRICS_LOG_INTERVAL", 0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_id: "exam_portal".to_string(),
            collections: Collections::default(),
            default_ttl: 300,
            page_limit: 5000,
            fetch_timeout: 10,
            server_port: 3000,
            seed_file: None,
            metrics_log_interval: 0,
        }
    }
}
