//! State shared by every channel: level threshold and formatter

use bytes::Bytes;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::format::Formatter;
use crate::level::Level;
use crate::record::RecordRef;

pub struct ChannelBase {
    level: AtomicU8,
    formatter: Arc<dyn Formatter>,
}

impl ChannelBase {
    pub fn new(level: Level, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            level: AtomicU8::new(level.to_u8()),
            formatter,
        }
    }

    #[inline]
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.to_u8(), Ordering::Relaxed);
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// Formatted record, cached on the record per formatter
    ///
    /// A formatter error drops the record for this channel.
    pub fn format(&self, record: &RecordRef) -> Option<Bytes> {
        match record.formatted(&self.formatter) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("{} formatter failed: {}", self.formatter.name(), e);
                None
            }
        }
    }
}

impl std::fmt::Debug for ChannelBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBase")
            .field("level", &self.level())
            .field("formatter", &self.formatter.name())
            .finish()
    }
}
