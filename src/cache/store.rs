//! TTL Cache Store Module
//!
//! Keyed store with per-entry TTL. Expired entries are never served: reads
//! check the clock themselves, and every insertion also arms a one-shot
//! eviction timer so untouched entries are physically removed.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, DEFAULT_TTL};

// == Cache Inner ==
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
    default_ttl: Duration,
    next_generation: u64,
    /// Set by `close`; no new eviction timers are armed afterwards
    closed: bool,
}

impl<V> CacheInner<V> {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(mut entry) => {
                entry.cancel_eviction();
                self.stats.set_total_entries(self.entries.len());
                true
            }
            None => false,
        }
    }

    fn remove_expired(&mut self, key: &str) {
        if self.remove(key) {
            self.stats.record_expiration();
            debug!(key, "cache entry expired");
        }
    }

    /// Timer callback: only the generation that armed the timer may evict.
    fn evict_if_current(&mut self, key: &str, generation: u64) {
        let current = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if !current {
            return;
        }

        if let Some(mut entry) = self.entries.remove(key) {
            // Running inside this very timer; detach instead of aborting.
            entry.eviction.take();
        }
        self.stats.set_total_entries(self.entries.len());
        self.stats.record_expiration();
        debug!(key, generation, "cache entry evicted by timer");
    }

    fn cancel_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.cancel_eviction();
        }
    }
}

impl<V> Drop for CacheInner<V> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock_inner<V>(inner: &Mutex<CacheInner<V>>) -> MutexGuard<'_, CacheInner<V>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

// == TTL Cache ==
/// Cloneable handle to a shared TTL cache.
///
/// Clones share the same storage. There is no process-wide instance: owners
/// create one and pass it to whatever needs it.
///
/// `size` counts physically stored entries. Between an entry's expiry and its
/// timer firing it may still be counted; reads never return it.
pub struct TtlCache<V> {
    inner: Arc<Mutex<CacheInner<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock_inner(&*self.inner);
        f.debug_struct("TtlCache")
            .field("entries", &inner.entries.len())
            .field("default_ttl", &inner.default_ttl)
            .field("closed", &inner.closed)
            .finish()
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates an empty cache whose `set` uses `default_ttl` when no TTL is given.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
                default_ttl,
                next_generation: 0,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        lock_inner(&*self.inner)
    }

    // == Set ==
    /// Stores a value, replacing any previous one for the same key.
    ///
    /// The previous entry's eviction timer is cancelled and a new one is armed
    /// for `ttl` (or the default TTL). Outside a tokio runtime no timer is
    /// armed and the entry expires lazily on read.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let mut guard = self.lock();
        let inner = &mut *guard;

        let ttl = ttl.unwrap_or(inner.default_ttl);
        if let Some(mut previous) = inner.entries.remove(&key) {
            previous.cancel_eviction();
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let mut entry = CacheEntry::new(value, ttl, generation);
        if !inner.closed {
            entry.eviction = self.arm_eviction(&key, ttl, generation);
        }

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
        inner.entries.insert(key, entry);
        inner.stats.set_total_entries(inner.entries.len());
    }

    fn arm_eviction(&self, key: &str, ttl: Duration, generation: u64) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok()?;
        let weak = Arc::downgrade(&self.inner);
        let key = key.to_string();

        Some(runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                lock_inner(&*inner).evict_if_current(&key, generation);
            }
        }))
    }

    // == Get ==
    /// Returns the value if present and not expired.
    ///
    /// Expiry is checked against the clock, whether or not the eviction timer
    /// has fired yet. An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.entries.get(key).map(|entry| entry.is_expired()) {
            None => {
                inner.stats.record_miss();
                None
            }
            Some(true) => {
                inner.remove_expired(key);
                inner.stats.record_miss();
                None
            }
            Some(false) => {
                inner.stats.record_hit();
                inner.entries.get(key).map(|entry| entry.value.clone())
            }
        }
    }

    // == Has ==
    /// Returns true if `get` would currently succeed.
    ///
    /// Another handle may delete or overwrite the key right after this
    /// returns; callers that need the value should use `get` alone.
    pub fn has(&self, key: &str) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.entries.get(key).map(|entry| entry.is_expired()) {
            None => false,
            Some(true) => {
                inner.remove_expired(key);
                false
            }
            Some(false) => true,
        }
    }

    // == Delete ==
    /// Removes an entry and cancels its timer. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    /// Removes every entry whose key matches `predicate`; returns how many.
    pub fn delete_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let mut inner = self.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    // == Clear ==
    /// Removes every entry and cancels every pending eviction.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.cancel_all();
        inner.entries.clear();
        inner.stats.set_total_entries(0);
    }

    // == Close ==
    /// Teardown: cancels pending timers and stops arming new ones.
    ///
    /// Entries stay readable until they expire; expiry is then lazy only.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.cancel_all();
    }

    // == Size ==
    /// Number of physically stored entries.
    pub fn size(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn default_ttl(&self) -> Duration {
        self.lock().default_ttl
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Get Or Fetch ==
    /// Read-through helper: returns the cached value, or awaits `fetch` and
    /// caches its `Ok` result. Errors are returned and never cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            debug!(key, "cache hit");
            return Ok(value);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}
