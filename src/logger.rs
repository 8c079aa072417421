//! Logger: the call-site API
//!
//! A `Logger` owns its channels, filters and tags. Each log call takes a
//! record from the pool, fills it, runs the filters, freezes it and hands it
//! to every enabled channel. In async mode the channels are wrapped in one
//! `AsyncChannel` and the call returns as soon as the record is queued.
//!
//! ```ignore
//! let logger = Logger::builder()
//!     .channel(ConsoleChannel::new(ChannelOptions::new())?)
//!     .tag("env", "prod")
//!     .asynchronous(true)
//!     .build()?;
//!
//! logger.info("listening");
//! logger.with([Field::new("port", 8080u16)]).warn("port in use");
//! logger.stop()?;
//! ```

use std::fmt::{self, Write as _};
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::channel::Channel;
use crate::constants::DEFAULT_MAX_QUEUED;
use crate::dispatch::{AsyncChannel, DispatchStats};
use crate::error::Result;
use crate::field::{Field, FieldValue};
use crate::filter::Filter;
use crate::level::Level;
use crate::record::{Caller, RecordBuilder, RecordPool};
use crate::tags::Tags;

// =============================================================================
// Builder
// =============================================================================

pub struct LoggerBuilder {
    channels: Vec<Arc<dyn Channel>>,
    filters: Vec<Box<dyn Filter>>,
    tags: Tags,
    level: Level,
    max_queued: usize,
    disable_caller: bool,
    asynchronous: bool,
    pool: Option<Arc<RecordPool>>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            filters: Vec::new(),
            tags: Tags::new(),
            level: Level::Trace,
            max_queued: DEFAULT_MAX_QUEUED,
            disable_caller: false,
            asynchronous: false,
            pool: None,
        }
    }
}

impl LoggerBuilder {
    pub fn channel(mut self, channel: impl Channel + 'static) -> Self {
        self.channels.push(Arc::new(channel));
        self
    }

    pub fn shared_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in tags {
            self.tags.insert(k, v);
        }
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Queue bound for async mode
    pub fn max_queued(mut self, max: usize) -> Self {
        self.max_queued = max;
        self
    }

    /// Skip file/line capture
    pub fn disable_caller(mut self, disable: bool) -> Self {
        self.disable_caller = disable;
        self
    }

    pub fn asynchronous(mut self, enabled: bool) -> Self {
        self.asynchronous = enabled;
        self
    }

    /// Record pool to draw from (default: the process-wide pool)
    pub fn pool(mut self, pool: Arc<RecordPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build and start the logger
    ///
    /// Channels that fail to open are reported through `tracing` and left
    /// to recover on their own; only a failure to start the dispatch thread
    /// is returned.
    pub fn build(self) -> Result<Logger> {
        let dispatch = self
            .asynchronous
            .then(|| AsyncChannel::new(self.channels.clone(), self.max_queued));
        let logger = Logger {
            level: AtomicU8::new(self.level.to_u8()),
            channels: self.channels,
            dispatch,
            filters: self.filters,
            tags: Arc::new(self.tags),
            disable_caller: self.disable_caller,
            pool: self.pool.unwrap_or_else(RecordPool::global),
        };
        logger.start()?;
        Ok(logger)
    }
}

// =============================================================================
// Logger
// =============================================================================

pub struct Logger {
    level: AtomicU8,
    channels: Vec<Arc<dyn Channel>>,
    dispatch: Option<AsyncChannel>,
    filters: Vec<Box<dyn Filter>>,
    tags: Arc<Tags>,
    disable_caller: bool,
    pool: Arc<RecordPool>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a record at `level` passes the logger threshold
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        self.level().accepts(level)
    }

    /// Change the logger threshold (empty `name`) or a channel's threshold
    ///
    /// Returns false when no channel has that name.
    pub fn set_level(&self, name: &str, level: Level) -> bool {
        if name.is_empty() {
            self.level.store(level.to_u8(), Ordering::Relaxed);
            return true;
        }
        match self.channel(name) {
            Some(channel) => {
                channel.set_level(level);
                true
            }
            None => match &self.dispatch {
                Some(engine) if engine.name() == name => {
                    engine.set_level(level);
                    true
                }
                _ => false,
            },
        }
    }

    /// Configured channel by name
    pub fn channel(&self, name: &str) -> Option<&Arc<dyn Channel>> {
        self.channels.iter().find(|c| c.name() == name)
    }

    pub fn channels(&self) -> &[Arc<dyn Channel>] {
        &self.channels
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn is_async(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Drop accounting of the async path
    pub fn dispatch_stats(&self) -> Option<&Arc<DispatchStats>> {
        self.dispatch.as_ref().map(|d| d.stats())
    }

    pub fn pool(&self) -> &Arc<RecordPool> {
        &self.pool
    }

    /// Open every channel (and the dispatch thread in async mode)
    pub fn start(&self) -> Result<()> {
        match &self.dispatch {
            Some(engine) => engine.open(),
            None => {
                for channel in &self.channels {
                    if let Err(e) = channel.open() {
                        tracing::warn!("{}: open failed: {}", channel.name(), e);
                    }
                }
                Ok(())
            }
        }
    }

    /// Flush queued records and close every channel
    ///
    /// In async mode this is terminal: later records are dropped.
    pub fn stop(&self) -> Result<()> {
        match &self.dispatch {
            Some(engine) => engine.close(),
            None => {
                let mut result = Ok(());
                for channel in &self.channels {
                    if let Err(e) = channel.close() {
                        tracing::warn!("{}: close failed: {}", channel.name(), e);
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
                result
            }
        }
    }

    /// Tag, filter, freeze and deliver a populated record
    pub fn write(&self, mut record: RecordBuilder) {
        record.set_tags(Arc::clone(&self.tags));
        for filter in &self.filters {
            if let Err(e) = filter.apply(&mut record) {
                tracing::trace!("{}", e);
                return;
            }
        }

        let record = record.freeze();
        let level = record.level();
        match &self.dispatch {
            Some(engine) => {
                if engine.enabled(level) {
                    engine.write(&record);
                }
            }
            None => {
                for channel in &self.channels {
                    if channel.enabled(level) {
                        channel.write(&record);
                    }
                }
            }
        }
    }

    #[track_caller]
    pub fn log<I>(&self, level: Level, msg: &str, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.enabled(level) {
            return;
        }
        let mut record = self.pool.acquire();
        record.set_level(level).set_text(msg).extend_fields(fields);
        self.emit(record, Location::caller(), None);
    }

    /// Log a message built by `format_args!`
    #[track_caller]
    pub fn log_fmt(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        let mut record = self.pool.acquire();
        record.set_level(level);
        write_args(record.text_mut(), args);
        self.emit(record, Location::caller(), None);
    }

    /// Start an entry carrying extra fields
    pub fn with<I>(&self, fields: I) -> Entry<'_>
    where
        I: IntoIterator<Item = Field>,
    {
        Entry {
            logger: self,
            fields: fields.into_iter().collect(),
            module: None,
        }
    }

    #[track_caller]
    pub fn trace(&self, msg: &str) {
        self.log(Level::Trace, msg, None)
    }

    #[track_caller]
    pub fn debug(&self, msg: &str) {
        self.log(Level::Debug, msg, None)
    }

    #[track_caller]
    pub fn info(&self, msg: &str) {
        self.log(Level::Info, msg, None)
    }

    #[track_caller]
    pub fn warn(&self, msg: &str) {
        self.log(Level::Warn, msg, None)
    }

    #[track_caller]
    pub fn error(&self, msg: &str) {
        self.log(Level::Error, msg, None)
    }

    /// Log at `Fatal`; the process keeps running
    #[track_caller]
    pub fn fatal(&self, msg: &str) {
        self.log(Level::Fatal, msg, None)
    }

    fn emit(
        &self,
        mut record: RecordBuilder,
        location: &'static Location<'static>,
        module: Option<&'static str>,
    ) {
        if !self.disable_caller {
            let mut caller = Caller::from_location(location);
            if let Some(module) = module {
                caller = caller.with_module(module);
            }
            record.set_caller(caller);
        }
        self.write(record);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field(
                "channels",
                &self.channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("async", &self.dispatch.is_some())
            .field("tags", &self.tags)
            .finish()
    }
}

fn write_args(text: &mut String, args: fmt::Arguments<'_>) {
    match args.as_str() {
        Some(s) => text.push_str(s),
        None => {
            let _ = text.write_fmt(args);
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// Fields accumulated for one log call
#[must_use = "an entry logs nothing until a level method is called"]
pub struct Entry<'a> {
    logger: &'a Logger,
    fields: Vec<Field>,
    module: Option<&'static str>,
}

impl<'a> Entry<'a> {
    pub fn field(mut self, key: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }

    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        self.fields.extend(fields);
        self
    }

    /// Attach the calling module, usually `module_path!()`
    pub fn module(mut self, module: &'static str) -> Self {
        self.module = Some(module);
        self
    }

    #[track_caller]
    pub fn log(self, level: Level, msg: &str) {
        if !self.logger.enabled(level) {
            return;
        }
        let mut record = self.logger.pool.acquire();
        record
            .set_level(level)
            .set_text(msg)
            .extend_fields(self.fields);
        self.logger.emit(record, Location::caller(), self.module);
    }

    #[track_caller]
    pub fn log_fmt(self, level: Level, args: fmt::Arguments<'_>) {
        if !self.logger.enabled(level) {
            return;
        }
        let mut record = self.logger.pool.acquire();
        record.set_level(level).extend_fields(self.fields);
        write_args(record.text_mut(), args);
        self.logger.emit(record, Location::caller(), self.module);
    }

    #[track_caller]
    pub fn trace(self, msg: &str) {
        self.log(Level::Trace, msg)
    }

    #[track_caller]
    pub fn debug(self, msg: &str) {
        self.log(Level::Debug, msg)
    }

    #[track_caller]
    pub fn info(self, msg: &str) {
        self.log(Level::Info, msg)
    }

    #[track_caller]
    pub fn warn(self, msg: &str) {
        self.log(Level::Warn, msg)
    }

    #[track_caller]
    pub fn error(self, msg: &str) {
        self.log(Level::Error, msg)
    }

    #[track_caller]
    pub fn fatal(self, msg: &str) {
        self.log(Level::Fatal, msg)
    }
}
