//! Common channel options
//!
//! One options struct covers every channel; each channel reads the fields it
//! understands and ignores the rest.
//!
//! ```ignore
//! let gelf = GelfChannel::new(
//!     ChannelOptions::new()
//!         .with_url("udp://graylog:12201")
//!         .with_compress(CompressType::Zlib, 6),
//! )?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::{DEFAULT_COMPRESS_LEVEL, DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_MAX_FILES};
use crate::error::Result;
use crate::format::{Formatter, TextFormatter};
use crate::level::Level;
use crate::transport::CompressType;

#[derive(Clone)]
pub struct ChannelOptions {
    /// Threshold; records below it are skipped
    pub level: Level,
    /// Explicit formatter, takes precedence over `layout`
    pub formatter: Option<Arc<dyn Formatter>>,
    /// Text layout used to build a `TextFormatter`
    pub layout: Option<String>,
    /// File sink path (default `<exe name>.log`)
    pub path: Option<PathBuf>,
    /// Rotate the file when it grows past this size; 0 disables rotation
    pub max_bytes: u64,
    /// Rotated files kept
    pub max_files: usize,
    /// Remote address: `scheme://host:port` or an HTTP base URL
    pub url: String,
    /// Host reported in wire envelopes (default: discovered IPv4)
    pub host: Option<String>,
    pub compress_type: CompressType,
    pub compress_level: u32,
    pub max_datagram_size: usize,
    /// Extra attempts after a failed HTTP request
    pub retry: usize,
    /// Records per bulk request; 0 uses the default
    pub batch: usize,
    /// Index name prefix for the HTTP bulk sink
    pub index: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            level: Level::Trace,
            formatter: None,
            layout: None,
            path: None,
            max_bytes: 0,
            max_files: DEFAULT_MAX_FILES,
            url: String::new(),
            host: None,
            compress_type: CompressType::None,
            compress_level: DEFAULT_COMPRESS_LEVEL,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            retry: 0,
            batch: 0,
            index: String::new(),
        }
    }
}

impl ChannelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_rotation(mut self, max_bytes: u64, max_files: usize) -> Self {
        self.max_bytes = max_bytes;
        self.max_files = max_files;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_compress(mut self, kind: CompressType, level: u32) -> Self {
        self.compress_type = kind;
        self.compress_level = level;
        self
    }

    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    pub fn with_retry(mut self, retry: usize) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Formatter to use: explicit, else built from `layout`, else `fallback`
    pub fn resolve_formatter(
        &self,
        fallback: fn() -> Arc<dyn Formatter>,
    ) -> Result<Arc<dyn Formatter>> {
        if let Some(f) = &self.formatter {
            return Ok(Arc::clone(f));
        }
        match self.layout.as_deref() {
            Some(layout) if !layout.is_empty() => Ok(Arc::new(TextFormatter::new(layout)?)),
            _ => Ok(fallback()),
        }
    }
}

impl std::fmt::Debug for ChannelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelOptions")
            .field("level", &self.level)
            .field("formatter", &self.formatter.as_ref().map(|f| f.name().to_string()))
            .field("layout", &self.layout)
            .field("path", &self.path)
            .field("url", &self.url)
            .field("compress_type", &self.compress_type)
            .finish_non_exhaustive()
    }
}
