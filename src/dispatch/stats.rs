//! Dispatch counters
//!
//! Lock-free totals for the async path, so callers can tell how many records
//! were shed under load.

use std::sync::atomic::{AtomicU64, Ordering};

/// Accepted / dropped / delivered totals (fully lock-free)
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Records queued by `write`
    accepted: AtomicU64,
    /// Records refused because the queue was full or the engine not running
    dropped: AtomicU64,
    /// Records handed to every sink by the worker
    delivered: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count records discarded together, e.g. a queue that could not drain
    #[inline]
    pub(crate) fn add_dropped_many(&self, count: usize) {
        self.dropped.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_delivered(&self, count: usize) {
        self.delivered.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Accepted records not yet delivered
    pub fn pending(&self) -> u64 {
        self.accepted().saturating_sub(self.delivered())
    }
}
