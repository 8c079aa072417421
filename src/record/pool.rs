//! Record pool
//!
//! Free list of record bodies. `acquire` hands out a reset body wrapped in a
//! `RecordBuilder` (refcount 1); the last released reference gives the body
//! back through `recycle`. Counters are lock-free so tests and debug tooling
//! can check that every acquire is balanced by releases.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use super::{RecordBuilder, RecordData};
use crate::constants::RECORD_POOL_CAPACITY;

/// Snapshot of pool activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Records handed out by `acquire`
    pub acquired: u64,
    /// Extra references taken with `retain`
    pub retained: u64,
    /// References dropped (builders included)
    pub released: u64,
    /// Bodies that went back to the free list or were discarded at refcount 0
    pub recycled: u64,
    /// Bodies currently idle in the free list
    pub idle: usize,
}

impl PoolStats {
    /// Records acquired but not yet returned
    pub fn in_flight(&self) -> u64 {
        self.acquired - self.recycled
    }
}

/// Pool of reusable record bodies
pub struct RecordPool {
    free: Mutex<Vec<RecordData>>,
    capacity: usize,
    acquired: AtomicU64,
    retained: AtomicU64,
    released: AtomicU64,
    recycled: AtomicU64,
}

impl RecordPool {
    /// Create a pool keeping at most `capacity` idle bodies
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::with_capacity(capacity.min(64))),
            capacity,
            acquired: AtomicU64::new(0),
            retained: AtomicU64::new(0),
            released: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
        })
    }

    /// Process-wide pool shared by loggers that do not bring their own
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<RecordPool>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| RecordPool::new(RECORD_POOL_CAPACITY))
            .clone()
    }

    /// Take a cleared record with a fresh timestamp and refcount 1
    pub fn acquire(self: &Arc<Self>) -> RecordBuilder {
        let id = self.acquired.fetch_add(1, Ordering::Relaxed) + 1;
        let mut data = self.free.lock().pop().unwrap_or_default();
        data.reset(id, Utc::now());
        RecordBuilder::new(data, Arc::clone(self))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            retained: self.retained.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            idle: self.free.lock().len(),
        }
    }

    #[inline]
    pub(crate) fn note_retain(&self) {
        self.retained.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn note_release(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a body whose refcount reached zero
    pub(crate) fn recycle(&self, data: RecordData) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(data);
        }
    }
}

impl std::fmt::Debug for RecordPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPool")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_balances() {
        let pool = RecordPool::new(8);
        let record = pool.acquire().freeze();
        assert_eq!(record.ref_count(), 1);
        drop(record);

        let stats = pool.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.recycled, 1);
        assert_eq!(stats.in_flight(), 0);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_dropped_builder_is_recycled() {
        let pool = RecordPool::new(8);
        let mut builder = pool.acquire();
        builder.set_text("never sent");
        drop(builder);
        assert_eq!(pool.stats().recycled, 1);
    }

    #[test]
    fn test_capacity_bounds_idle_list() {
        let pool = RecordPool::new(1);
        let a = pool.acquire().freeze();
        let b = pool.acquire().freeze();
        drop(a);
        drop(b);
        let stats = pool.stats();
        assert_eq!(stats.recycled, 2);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_reused_body_is_reset() {
        let pool = RecordPool::new(4);
        let mut builder = pool.acquire();
        builder.set_text("first");
        builder.push_field(crate::field::Field::new("k", 1));
        drop(builder.freeze());

        let builder = pool.acquire();
        assert_eq!(builder.text(), "");
        assert!(builder.fields().is_empty());
        assert_eq!(pool.stats().idle, 0);
    }
}
