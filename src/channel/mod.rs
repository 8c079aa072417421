//! Output channels (sinks)
//!
//! A `Channel` receives frozen records and delivers them somewhere. Channels
//! are registered once when a logger is built and shared by the logger and
//! the async dispatch worker, so every method takes `&self`.
//!
//! Channels never report delivery failures to the caller: `write` returns
//! nothing, and transient errors go to `tracing`.
//!
//! # Adding a new channel
//!
//! 1. Create `channel/my_channel.rs` holding a `ChannelBase`
//! 2. Implement `Channel` (and `BatchChannel` if grouped delivery helps)
//! 3. Add a `ChannelConfig` variant in `config.rs`

mod base;
mod console;
mod elastic;
mod file;
mod gelf;
mod options;

pub use base::ChannelBase;
pub use console::ConsoleChannel;
pub use elastic::ElasticChannel;
pub use file::FileChannel;
pub use gelf::{GelfChannel, GelfFormatter};
pub use options::ChannelOptions;

use crate::error::Result;
use crate::level::Level;
use crate::record::RecordRef;

/// A delivery target for records
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    fn level(&self) -> Level;

    fn set_level(&self, level: Level);

    /// Whether a record at `level` should be written here
    fn enabled(&self, level: Level) -> bool {
        self.level().accepts(level)
    }

    /// Acquire resources; safe to call again after a failure
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Release every held resource (files, sockets, idle connections)
    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn write(&self, record: &RecordRef);

    /// Batch view of this channel, for sinks that prefer grouped delivery
    fn as_batch(&self) -> Option<&dyn BatchChannel> {
        None
    }
}

/// Channel accepting several records per call
pub trait BatchChannel: Channel {
    /// Deliver `records`, all already accepted by `enabled`
    fn write_batch(&self, records: &[&RecordRef]);
}
