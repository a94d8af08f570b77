//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and lifecycle metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion instant (monotonic)
    pub created_at: Instant,
    /// Time-to-live measured from `created_at`
    pub ttl: Duration,
    /// Insertion generation, used to ignore stale eviction timers
    pub generation: u64,
    /// Pending eviction timer, if one was armed
    pub(crate) eviction: Option<JoinHandle<()>>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current instant.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Time-to-live from now
    /// * `generation` - Insertion generation assigned by the store
    pub fn new(value: V, ttl: Duration, generation: u64) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            generation,
            eviction: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is valid only while `now - created_at < ttl`, so it is
    /// expired from the exact instant the TTL has fully elapsed.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.created_at.elapsed())
    }

    // == Cancel Eviction ==
    /// Aborts the pending eviction timer, if any.
    pub(crate) fn cancel_eviction(&mut self) {
        if let Some(handle) = self.eviction.take() {
            handle.abort();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), Duration::from_secs(60), 1);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.generation, 1);
        assert!(entry.eviction.is_none());
        assert!(!entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new(42u32, Duration::from_secs(1), 1);
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(), "Entry should be expired at the TTL boundary");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining() {
        let entry = CacheEntry::new((), Duration::from_secs(10), 1);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(entry.ttl_remaining(), Duration::from_secs(6));

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new((), Duration::ZERO, 1);
        assert!(entry.is_expired());
    }
}
