//! Asynchronous dispatch engine
//!
//! `AsyncChannel` is itself a `Channel` wrapping the real sinks. Producers
//! push records into a bounded queue and return immediately; one background
//! thread drains the queue and writes to every sink.
//!
//! ```text
//! write() ──lock──► Queue ──swap──► worker ──► batch sinks (level subsets)
//!                    (≤ max)                └─► plain sinks (one by one)
//! ```
//!
//! Lifecycle is one-way: `NotStarted → Starting → Running → Stopped`. Sinks
//! are opened in `Starting` with the lock released. A full queue or a
//! non-running engine drops the record and counts it in `DispatchStats`.
//! A panicking sink is logged and skipped; the worker keeps delivering.
//! `close()` drains whatever was queued before it was called, joins the
//! worker and closes the sinks.

mod stats;

pub use stats::DispatchStats;

use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::channel::Channel;
use crate::constants::{DEFAULT_MAX_QUEUED, DISPATCH_THREAD_NAME};
use crate::error::{LogError, Result};
use crate::level::Level;
use crate::queue::Queue;
use crate::record::RecordRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    NotStarted,
    Starting,
    Running,
    Stopped,
}

struct Inner {
    status: Status,
    queue: Queue,
}

/// State shared with the worker: one lock, one condition
struct Shared {
    inner: Mutex<Inner>,
    ready: Condvar,
}

pub struct AsyncChannel {
    shared: Arc<Shared>,
    channels: Arc<[Arc<dyn Channel>]>,
    max_queued: usize,
    level: AtomicU8,
    stats: Arc<DispatchStats>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncChannel {
    /// Wrap `channels`; `max_queued == 0` uses the default bound
    pub fn new(channels: Vec<Arc<dyn Channel>>, max_queued: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    status: Status::NotStarted,
                    queue: Queue::new(),
                }),
                ready: Condvar::new(),
            }),
            channels: channels.into(),
            max_queued: if max_queued == 0 {
                DEFAULT_MAX_QUEUED
            } else {
                max_queued
            },
            level: AtomicU8::new(Level::Trace.to_u8()),
            stats: Arc::new(DispatchStats::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn channels(&self) -> &[Arc<dyn Channel>] {
        &self.channels
    }

    pub fn max_queued(&self) -> usize {
        self.max_queued
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Records waiting for the worker
    pub fn queued(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.inner.lock().status == Status::Running
    }
}

impl Channel for AsyncChannel {
    fn name(&self) -> &str {
        "async"
    }

    fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: Level) {
        self.level.store(level.to_u8(), Ordering::Relaxed);
    }

    /// Skip records that no wrapped sink would take
    fn enabled(&self, level: Level) -> bool {
        self.level().accepts(level) && self.channels.iter().any(|c| c.enabled(level))
    }

    fn open(&self) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock();
            match inner.status {
                Status::Starting | Status::Running => return Ok(()),
                Status::Stopped => return Err(LogError::NotReady { channel: "async" }),
                Status::NotStarted => inner.status = Status::Starting,
            }
        }

        // Sink opens may block on the network; writes meanwhile are dropped
        for channel in self.channels.iter() {
            if let Err(e) = channel.open() {
                tracing::warn!("{}: open failed: {}", channel.name(), e);
            }
        }

        let mut inner = self.shared.inner.lock();
        if inner.status != Status::Starting {
            return Err(LogError::NotReady { channel: "async" });
        }
        let shared = Arc::clone(&self.shared);
        let channels = Arc::clone(&self.channels);
        let stats = Arc::clone(&self.stats);
        let handle = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || run_worker(shared, channels, stats))
            .map_err(|e| {
                inner.status = Status::Stopped;
                LogError::Spawn { source: e }
            })?;

        inner.status = Status::Running;
        *self.worker.lock() = Some(handle);
        tracing::debug!("dispatch started ({} sinks)", self.channels.len());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock();
            if inner.status == Status::Stopped {
                return Ok(());
            }
            inner.status = Status::Stopped;
        }
        self.shared.ready.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                let mut inner = self.shared.inner.lock();
                let lost = inner.queue.len();
                inner.queue.clear();
                drop(inner);
                self.stats.add_dropped_many(lost);
                tracing::warn!("dispatch worker panicked; {} queued records dropped", lost);
            }
        }

        let mut result = Ok(());
        for channel in self.channels.iter() {
            if let Err(e) = channel.close() {
                tracing::warn!("{}: close failed: {}", channel.name(), e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn write(&self, record: &RecordRef) {
        let mut inner = self.shared.inner.lock();
        if inner.status == Status::Running && inner.queue.len() < self.max_queued {
            inner.queue.push(record);
            drop(inner);
            self.stats.add_accepted();
            self.shared.ready.notify_one();
        } else {
            drop(inner);
            self.stats.add_dropped();
        }
    }
}

impl Drop for AsyncChannel {
    fn drop(&mut self) {
        if self.worker.get_mut().is_some() {
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for AsyncChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncChannel")
            .field("channels", &self.channels.len())
            .field("max_queued", &self.max_queued)
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Worker
// =============================================================================

fn run_worker(shared: Arc<Shared>, channels: Arc<[Arc<dyn Channel>]>, stats: Arc<DispatchStats>) {
    let mut taken = Queue::new();
    loop {
        let stopping = {
            let mut inner = shared.inner.lock();
            while inner.queue.is_empty() && inner.status == Status::Running {
                shared.ready.wait(&mut inner);
            }
            std::mem::swap(&mut inner.queue, &mut taken);
            // Writes are refused once stopped, so this swap is the final drain
            inner.status != Status::Running
        };

        let count = taken.len();
        deliver(&channels, &mut taken);
        stats.add_delivered(count);

        if stopping {
            tracing::debug!("dispatch stopped");
            return;
        }
    }
}

/// Write every record in `batch` to its sinks, then release it
fn deliver(channels: &[Arc<dyn Channel>], batch: &mut Queue) {
    if batch.is_empty() {
        return;
    }

    {
        // Subsets are shared by batch sinks with the same threshold
        let mut subsets: Vec<(Level, Vec<&RecordRef>)> = Vec::new();
        for channel in channels {
            let Some(sink) = channel.as_batch() else {
                continue;
            };
            let level = channel.level();
            let idx = match subsets.iter().position(|(l, _)| *l == level) {
                Some(idx) => idx,
                None => {
                    let subset = batch.iter().filter(|r| level.accepts(r.level())).collect();
                    subsets.push((level, subset));
                    subsets.len() - 1
                }
            };
            let records = &subsets[idx].1;
            if !records.is_empty() {
                guarded(channel.name(), || sink.write_batch(records));
            }
        }
    }

    while let Some(record) = batch.pop() {
        for channel in channels {
            if channel.as_batch().is_none() && channel.enabled(record.level()) {
                guarded(channel.name(), || channel.write(&record));
            }
        }
        record.release();
    }
}

/// Run one sink call, containing a panic so the other sinks still get records
fn guarded(name: &str, write: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(write)) {
        let reason = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        tracing::warn!("{}: write panicked: {}", name, reason);
    }
}
