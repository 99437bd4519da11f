//! Set of fingerprints whose provider call is currently running.
//!
//! A duplicate request is rejected rather than queued behind the running one.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::CacheKey;

#[derive(Default)]
struct TrackerInner {
    // key -> ticket of the slot that owns it
    slots: HashMap<CacheKey, u64>,
    next_ticket: u64,
}

#[derive(Default)]
pub struct InFlightTracker {
    inner: Mutex<TrackerInner>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire_ticket(&self, key: CacheKey) -> Option<u64> {
        let mut inner = self.inner.lock();
        if inner.slots.contains_key(&key) {
            return None;
        }
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.slots.insert(key, ticket);
        Some(ticket)
    }

    /// Atomic check-and-insert. Returns false, changing nothing, if `key` is
    /// already in flight.
    pub fn try_acquire(&self, key: CacheKey) -> bool {
        self.acquire_ticket(key).is_some()
    }

    /// Like [`try_acquire`](Self::try_acquire), but returns a guard that
    /// releases the key when dropped, including on early return, panic, or
    /// when the owning future is cancelled.
    pub fn acquire_slot(&self, key: CacheKey) -> Option<InFlightSlot<'_>> {
        let ticket = self.acquire_ticket(key)?;
        Some(InFlightSlot {
            tracker: self,
            key,
            ticket,
        })
    }

    /// Remove `key` unconditionally. No-op if absent.
    pub fn release(&self, key: &CacheKey) {
        self.inner.lock().slots.remove(key);
    }

    fn release_ticket(&self, key: &CacheKey, ticket: u64) {
        let mut inner = self.inner.lock();
        // After a clear() the key may belong to a newer slot; leave that one alone.
        if inner.slots.get(key) == Some(&ticket) {
            inner.slots.remove(key);
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        if !inner.slots.is_empty() {
            debug!(dropped = inner.slots.len(), "in-flight set cleared");
        }
        inner.slots.clear();
    }
}

/// Ownership of one in-flight key. Dropping it releases the key.
#[must_use = "dropping the slot releases it immediately"]
pub struct InFlightSlot<'a> {
    tracker: &'a InFlightTracker,
    key: CacheKey,
    ticket: u64,
}

impl InFlightSlot<'_> {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.tracker.release_ticket(&self.key, self.ticket);
    }
}
