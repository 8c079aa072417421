//! Pooled growable byte buffer
//!
//! `Buffer` wraps a `BytesMut` taken from a process-wide free list and gives it
//! back on drop. Typed append helpers write straight into the buffer without
//! building intermediate `String`s.
//!
//! A buffer is owned by exactly one holder between acquire (`Buffer::new`)
//! and release (drop). Finished output leaves through `into_bytes` as a copy,
//! so the backing storage never stays shared with a frozen `Bytes` and goes
//! back to the pool with its full capacity.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::fmt::{self, Write as _};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::{BUFFER_POOL_CAPACITY, MAX_POOLED_BUFFER_SIZE, SMALL_BUFFER_SIZE};

static POOL: Mutex<Vec<BytesMut>> = parking_lot::const_mutex(Vec::new());

static ACQUIRED: AtomicU64 = AtomicU64::new(0);
static RELEASED: AtomicU64 = AtomicU64::new(0);

/// Snapshot of buffer pool activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub acquired: u64,
    pub released: u64,
    pub idle: usize,
}

/// Current buffer pool counters
pub fn pool_stats() -> BufferPoolStats {
    BufferPoolStats {
        acquired: ACQUIRED.load(Ordering::Relaxed),
        released: RELEASED.load(Ordering::Relaxed),
        idle: POOL.lock().len(),
    }
}

/// Append-only byte buffer with pooled backing storage
pub struct Buffer {
    buf: BytesMut,
}

impl Buffer {
    /// Acquire a cleared buffer from the pool
    pub fn new() -> Self {
        ACQUIRED.fetch_add(1, Ordering::Relaxed);
        let buf = POOL
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(SMALL_BUFFER_SIZE));
        Self { buf }
    }

    /// Acquire a buffer with room for at least `n` bytes
    pub fn with_capacity(n: usize) -> Self {
        let mut b = Self::new();
        b.grow(n);
        b
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Last written byte, if any
    #[inline]
    pub fn last(&self) -> Option<u8> {
        self.buf.last().copied()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Ensure room for `n` more bytes, at least doubling when growing
    pub fn grow(&mut self, n: usize) {
        let free = self.buf.capacity() - self.buf.len();
        if n <= free {
            return;
        }
        let extra = n.max(self.buf.capacity()).max(SMALL_BUFFER_SIZE);
        self.buf.reserve(extra);
    }

    /// Copy the written bytes out and clear, keeping the allocation
    pub fn take_bytes(&mut self) -> Bytes {
        let out = Bytes::copy_from_slice(&self.buf);
        self.buf.clear();
        out
    }

    /// Finished output; the backing storage goes back to the pool whole
    pub fn into_bytes(mut self) -> Bytes {
        self.take_bytes()
    }

    // === Typed appends ===

    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        self.buf.extend_from_slice(&[b]);
    }

    #[inline]
    pub fn append_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn append_int(&mut self, v: i64) {
        let _ = write!(self.buf, "{}", v);
    }

    pub fn append_uint(&mut self, v: u64) {
        let _ = write!(self.buf, "{}", v);
    }

    pub fn append_bool(&mut self, v: bool) {
        self.append_str(if v { "true" } else { "false" });
    }

    pub fn append_f32(&mut self, v: f32) {
        let _ = write!(self.buf, "{}", v);
    }

    pub fn append_f64(&mut self, v: f64) {
        let _ = write!(self.buf, "{}", v);
    }

    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.buf.write_fmt(args);
    }

    /// Append `data` constrained to a display width.
    ///
    /// `max > 0` and longer input keeps the last `max` characters.
    /// `min < 0` left-aligns (pads right), `min > 0` right-aligns (pads left).
    pub fn put(&mut self, min: isize, max: usize, data: &str) {
        let size = data.chars().count();
        if size == 0 {
            return;
        }

        let width = min.unsigned_abs();
        if max > 0 && size > max {
            let start = data
                .char_indices()
                .nth(size - max)
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.append_str(&data[start..]);
        } else if min < 0 && size < width {
            self.grow(width);
            self.append_str(data);
            self.spaces(width - size);
        } else if min > 0 && size < width {
            self.grow(width);
            self.spaces(width - size);
            self.append_str(data);
        } else {
            self.append_str(data);
        }
    }

    /// Format `args` then append with `put` width rules
    pub fn put_fmt(&mut self, min: isize, max: usize, args: fmt::Arguments<'_>) {
        if min == 0 && max == 0 {
            self.append_fmt(args);
            return;
        }
        let mut tmp = Buffer::new();
        tmp.append_fmt(args);
        match std::str::from_utf8(tmp.as_bytes()) {
            Ok(s) => self.put(min, max, s),
            Err(_) => self.append_slice(tmp.as_bytes()),
        }
    }

    fn spaces(&mut self, count: usize) {
        for _ in 0..count {
            self.append_byte(b' ');
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        RELEASED.fetch_add(1, Ordering::Relaxed);
        if self.buf.capacity() > MAX_POOLED_BUFFER_SIZE {
            return;
        }
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let mut pool = POOL.lock();
        if pool.len() < BUFFER_POOL_CAPACITY {
            pool.push(buf);
        }
    }
}

impl io::Write for Buffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
