//! In-memory translation store with TTL expiry and oldest-first eviction.

pub mod key;

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub use key::{derive_key, CacheKey};

struct CacheEntry {
    value: String,
    created_at: Instant,
}

struct StoreInner {
    // Lookups only peek, so recency order is write order and the LRU end is
    // always the oldest entry. Expired entries form a suffix at that end.
    entries: LruCache<CacheKey, CacheEntry>,
    // Bumped by every clear().
    generation: u64,
}

/// Thread-safe map of fingerprint to translated text.
///
/// Age is measured with [`tokio::time::Instant`], which is monotonic and
/// follows tokio's paused clock under test.
pub struct ExpiringStore {
    inner: Mutex<StoreInner>,
    ttl: Duration,
    capacity: usize,
}

impl ExpiringStore {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                entries: LruCache::new(
                    NonZeroUsize::new(capacity).expect("cache capacity must be > 0"),
                ),
                generation: 0,
            }),
            ttl,
            capacity,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_expired(&self, created_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(created_at) > self.ttl
    }

    /// Look up a value. An entry older than the TTL is removed and reported absent.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let created_at = match inner.entries.peek(key) {
            Some(entry) if !self.is_expired(entry.created_at, now) => {
                return Some(entry.value.clone());
            }
            Some(entry) => entry.created_at,
            None => return None,
        };
        inner.entries.pop(key);
        debug!(
            key = %key.short(),
            age_ms = now.saturating_duration_since(created_at).as_millis() as u64,
            "expired on lookup"
        );
        None
    }

    /// Insert or overwrite. A new key arriving at capacity evicts exactly one
    /// entry first: the oldest, ties broken by insertion order.
    pub fn put(&self, key: CacheKey, value: String) {
        let mut inner = self.inner.lock();
        Self::insert(&mut inner, key, value);
    }

    /// Current clear generation, to be passed back to
    /// [`put_if_generation`](Self::put_if_generation).
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Like [`put`](Self::put), but only if no `clear()` has happened since
    /// `generation` was read. Returns whether the value was stored.
    pub fn put_if_generation(&self, key: CacheKey, value: String, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        Self::insert(&mut inner, key, value);
        true
    }

    fn insert(inner: &mut StoreInner, key: CacheKey, value: String) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
        };
        // push() moves an existing key to the front and returns its old value,
        // or evicts the LRU entry when a new key arrives at capacity.
        if let Some((evicted, _)) = inner.entries.push(key, entry) {
            if evicted != key {
                debug!(key = %evicted.short(), "evicted oldest entry");
            }
        }
    }

    /// Delete every entry older than the TTL, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut removed = 0;
        loop {
            let Some(created_at) = inner.entries.peek_lru().map(|(_, e)| e.created_at) else {
                break;
            };
            if !self.is_expired(created_at, now) {
                break;
            }
            inner.entries.pop_lru();
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, "expiry sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.generation += 1;
    }
}
