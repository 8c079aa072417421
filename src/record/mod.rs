//! Log record lifecycle
//!
//! A record starts as a `RecordBuilder` taken from a `RecordPool` and owned by
//! the call site. Once populated it is frozen into a `RecordRef`: an
//! immutable, atomically ref-counted handle that queues and sinks share.
//! Cloning a handle retains the record, dropping it releases; when the last
//! reference goes away the body returns to its pool for reuse.
//!
//! The only state that changes after freezing is the per-formatter output
//! cache, which is filled at most once per formatter under the record's lock.

mod caller;
mod pool;

pub use caller::Caller;
pub use pool::{PoolStats, RecordPool};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::field::Field;
use crate::format::{formatter_key, Formatter};
use crate::level::Level;
use crate::tags::Tags;

static EMPTY_TAGS: Tags = Tags::new();

/// Pooled record body
#[derive(Default)]
pub(crate) struct RecordData {
    id: u64,
    level: Level,
    text: String,
    time: DateTime<Utc>,
    tags: Option<Arc<Tags>>,
    fields: Vec<Field>,
    caller: Option<Caller>,
    /// Rendered output keyed by formatter identity
    outputs: Mutex<Vec<(usize, Bytes)>>,
}

impl RecordData {
    /// Clear reusable state; capacities of `text` and `fields` are kept
    fn reset(&mut self, id: u64, time: DateTime<Utc>) {
        self.id = id;
        self.level = Level::Info;
        self.text.clear();
        self.time = time;
        self.tags = None;
        self.fields.clear();
        self.caller = None;
        self.outputs.get_mut().clear();
    }
}

// =============================================================================
// Builder (mutable, owned by the call site)
// =============================================================================

/// A record being populated; not yet visible to any sink
pub struct RecordBuilder {
    data: Option<RecordData>,
    pool: Arc<RecordPool>,
}

impl RecordBuilder {
    fn new(data: RecordData, pool: Arc<RecordPool>) -> Self {
        Self {
            data: Some(data),
            pool,
        }
    }

    fn data(&self) -> &RecordData {
        self.data.as_ref().expect("record body present until freeze")
    }

    fn data_mut(&mut self) -> &mut RecordData {
        self.data.as_mut().expect("record body present until freeze")
    }

    pub fn level(&self) -> Level {
        self.data().level
    }

    pub fn set_level(&mut self, level: Level) -> &mut Self {
        self.data_mut().level = level;
        self
    }

    pub fn text(&self) -> &str {
        &self.data().text
    }

    pub fn set_text(&mut self, text: &str) -> &mut Self {
        let data = self.data_mut();
        data.text.clear();
        data.text.push_str(text);
        self
    }

    /// Pooled message storage, for writing formatted text in place
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.data_mut().text
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.data().time
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) -> &mut Self {
        self.data_mut().time = time;
        self
    }

    pub fn tags(&self) -> &Tags {
        self.data().tags.as_deref().unwrap_or(&EMPTY_TAGS)
    }

    pub fn set_tags(&mut self, tags: Arc<Tags>) -> &mut Self {
        self.data_mut().tags = Some(tags);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.data().fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.data_mut().fields
    }

    pub fn push_field(&mut self, field: Field) -> &mut Self {
        self.data_mut().fields.push(field);
        self
    }

    pub fn extend_fields(&mut self, fields: impl IntoIterator<Item = Field>) -> &mut Self {
        self.data_mut().fields.extend(fields);
        self
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.data().caller.as_ref()
    }

    pub fn set_caller(&mut self, caller: Caller) -> &mut Self {
        self.data_mut().caller = Some(caller);
        self
    }

    /// Seal the record; no further mutation is possible
    pub fn freeze(mut self) -> RecordRef {
        let data = self.data.take().expect("record body present until freeze");
        RecordRef {
            inner: Some(Arc::new(data)),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl Drop for RecordBuilder {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.pool.note_release();
            self.pool.recycle(data);
        }
    }
}

impl fmt::Debug for RecordBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => f
                .debug_struct("RecordBuilder")
                .field("id", &data.id)
                .field("level", &data.level)
                .field("text", &data.text)
                .finish(),
            None => f.write_str("RecordBuilder(frozen)"),
        }
    }
}

// =============================================================================
// Handle (immutable, shared)
// =============================================================================

/// Shared, read-only reference to a frozen record
///
/// `retain`/`clone` take another reference, `release`/drop give one back.
pub struct RecordRef {
    inner: Option<Arc<RecordData>>,
    pool: Arc<RecordPool>,
}

impl RecordRef {
    #[inline]
    fn data(&self) -> &RecordData {
        self.inner.as_deref().expect("record reference is live")
    }

    /// Take another reference to the same record
    pub fn retain(&self) -> RecordRef {
        self.pool.note_retain();
        RecordRef {
            inner: self.inner.clone(),
            pool: Arc::clone(&self.pool),
        }
    }

    /// Give this reference back
    pub fn release(self) {
        drop(self)
    }

    /// Live references to this record
    pub fn ref_count(&self) -> usize {
        self.inner.as_ref().map(Arc::strong_count).unwrap_or(0)
    }

    /// Identifier unique per acquisition from the pool
    pub fn id(&self) -> u64 {
        self.data().id
    }

    pub fn level(&self) -> Level {
        self.data().level
    }

    pub fn text(&self) -> &str {
        &self.data().text
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.data().time
    }

    pub fn tags(&self) -> &Tags {
        self.data().tags.as_deref().unwrap_or(&EMPTY_TAGS)
    }

    pub fn fields(&self) -> &[Field] {
        &self.data().fields
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.data().caller.as_ref()
    }

    /// Render through `formatter`, at most once per formatter per record
    pub fn formatted(&self, formatter: &Arc<dyn Formatter>) -> Result<Bytes> {
        let key = formatter_key(formatter);
        if let Some(bytes) = self.cached(key) {
            return Ok(bytes);
        }
        // Rendered unlocked: a formatter may read other cached outputs
        let bytes = formatter.format(self)?;
        let mut outputs = self.data().outputs.lock();
        if let Some((_, first)) = outputs.iter().find(|(k, _)| *k == key) {
            return Ok(first.clone());
        }
        outputs.push((key, bytes.clone()));
        Ok(bytes)
    }

    fn cached(&self, key: usize) -> Option<Bytes> {
        let outputs = self.data().outputs.lock();
        outputs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl Clone for RecordRef {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl Drop for RecordRef {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            self.pool.note_release();
            if let Some(data) = Arc::into_inner(inner) {
                self.pool.recycle(data);
            }
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("id", &self.id())
            .field("level", &self.level())
            .field("text", &self.text())
            .field("refs", &self.ref_count())
            .finish()
    }
}
