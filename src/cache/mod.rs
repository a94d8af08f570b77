//! Cache Module
//!
//! Provides an in-memory TTL cache with timer-driven eviction.

mod entry;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// TTL applied when a caller does not pass one
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for frequently-changing data such as notifications
pub const FREQUENT_TTL: Duration = Duration::from_secs(2 * 60);

/// TTL for slow-changing aggregates such as dashboard totals
pub const SLOW_CHANGING_TTL: Duration = Duration::from_secs(5 * 60);
