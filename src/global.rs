//! Process-wide default logger
//!
//! Convenience for binaries and quick scripts. The default is a synchronous
//! console logger created on first use; `set_default` swaps in another one
//! and stops the old one.
//!
//! Library code should take a `Logger` (or `Arc<Logger>`) explicitly: the
//! global is shared by every test in a process, so tests that replace it
//! interfere with each other.

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use crate::channel::{ChannelOptions, ConsoleChannel};
use crate::error::Result;
use crate::field::Field;
use crate::level::Level;
use crate::logger::Logger;

static DEFAULT: OnceLock<RwLock<Arc<Logger>>> = OnceLock::new();

fn slot() -> &'static RwLock<Arc<Logger>> {
    DEFAULT.get_or_init(|| {
        let logger = new_default().expect("synchronous console logger always starts");
        RwLock::new(Arc::new(logger))
    })
}

/// Console-only logger at `Trace`, the initial default
pub fn new_default() -> Result<Logger> {
    Logger::builder()
        .channel(ConsoleChannel::new(ChannelOptions::new())?)
        .build()
}

/// Current default logger
pub fn default() -> Arc<Logger> {
    Arc::clone(&slot().read())
}

/// Replace the default logger, stopping the previous one
pub fn set_default(logger: Logger) {
    let previous = std::mem::replace(&mut *slot().write(), Arc::new(logger));
    if let Err(e) = previous.stop() {
        tracing::warn!("stopping previous default logger: {}", e);
    }
}

#[track_caller]
pub fn log<I>(level: Level, msg: &str, fields: I)
where
    I: IntoIterator<Item = Field>,
{
    default().log(level, msg, fields)
}

#[track_caller]
pub fn trace(msg: &str) {
    default().trace(msg)
}

#[track_caller]
pub fn debug(msg: &str) {
    default().debug(msg)
}

#[track_caller]
pub fn info(msg: &str) {
    default().info(msg)
}

#[track_caller]
pub fn warn(msg: &str) {
    default().warn(msg)
}

#[track_caller]
pub fn error(msg: &str) {
    default().error(msg)
}

#[track_caller]
pub fn fatal(msg: &str) {
    default().fatal(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::record::{RecordPool, RecordRef};
    use parking_lot::Mutex;

    struct Capture(Mutex<Vec<(String, &'static str)>>);

    impl Channel for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        fn level(&self) -> Level {
            Level::Trace
        }

        fn set_level(&self, _level: Level) {}

        fn write(&self, record: &RecordRef) {
            let file = record.caller().map(|c| c.file()).unwrap_or("");
            self.0.lock().push((record.text().to_string(), file));
        }
    }

    // The only test touching the global slot
    #[test]
    fn test_set_default_routes_helpers() {
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let logger = Logger::builder()
            .shared_channel(capture.clone())
            .pool(RecordPool::new(4))
            .build()
            .unwrap();
        set_default(logger);

        info("via global");
        default().with([Field::new("k", 1)]).warn("with fields");

        let seen = capture.0.lock().clone();
        assert_eq!(seen[0], ("via global".to_string(), "global.rs"));
        assert_eq!(seen[1].0, "with fields");
    }
}
