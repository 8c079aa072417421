//! logrelay - structured, leveled logging with async dispatch
//!
//! A log call produces a pooled record that is frozen, formatted once per
//! formatter, and delivered to one or more channels:
//! - `ConsoleChannel` / `FileChannel` - local text or JSON output
//! - `ElasticChannel` - HTTP bulk indexing
//! - `GelfChannel` - GELF over UDP (compressed, chunked) or TCP
//!
//! In async mode the channels sit behind an `AsyncChannel`: a bounded queue
//! drained by one background thread, dropping records rather than blocking
//! the caller when full.

pub mod buffer;
pub mod channel;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod filter;
pub mod format;
pub mod global;
pub mod level;
pub mod logger;
pub mod queue;
pub mod record;
pub mod tags;
pub mod transport;

pub use channel::{
    BatchChannel, Channel, ChannelOptions, ConsoleChannel, ElasticChannel, FileChannel,
    GelfChannel,
};
pub use config::Config;
pub use dispatch::{AsyncChannel, DispatchStats};
pub use error::{LogError, Result};
pub use field::{Field, FieldValue};
pub use filter::Filter;
pub use format::{Formatter, JsonFormatter, TextFormatter};
pub use level::Level;
pub use logger::{Entry, Logger, LoggerBuilder};
pub use record::{RecordBuilder, RecordPool, RecordRef};
pub use tags::Tags;

/// Initialize internal tracing for the logger's own diagnostics
///
/// Call early in main() before any logging occurs.
/// Set `verbose` to true for debug-level output.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
