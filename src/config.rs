//! Configuration file
//!
//! A TOML file describing one logger and its channels:
//!
//! ```toml
//! level = "info"
//! async = true
//! max_queued = 10000
//!
//! [tags]
//! env = "prod"
//!
//! [[channels]]
//! kind = "console"
//! layout = "%-5p %m%n"
//!
//! [[channels]]
//! kind = "gelf"
//! url = "udp://graylog.local:12201"
//! compress = "zlib"
//! ```
//!
//! Every field is optional. Without any channel the logger writes to the
//! console.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channel::{
    Channel, ChannelOptions, ConsoleChannel, ElasticChannel, FileChannel, GelfChannel,
};
use crate::constants::{
    DEFAULT_BULK_SIZE, DEFAULT_COMPRESS_LEVEL, DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_MAX_FILES,
    DEFAULT_MAX_QUEUED,
};
use crate::error::{LogError, Result};
use crate::format::{default_json_formatter, JsonFormatter};
use crate::level::Level;
use crate::logger::Logger;
use crate::transport::CompressType;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "logrelay.toml";

// =============================================================================
// Logger Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logger threshold
    pub level: Level,
    /// Deliver through the background dispatch thread
    #[serde(rename = "async")]
    pub asynchronous: bool,
    /// Queue bound before records are dropped (async only)
    pub max_queued: usize,
    /// Skip file/line capture
    pub disable_caller: bool,
    /// Tags attached to every record
    pub tags: BTreeMap<String, String>,
    pub channels: Vec<ChannelConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Trace,
            asynchronous: false,
            max_queued: DEFAULT_MAX_QUEUED,
            disable_caller: false,
            tags: BTreeMap::new(),
            channels: Vec::new(),
        }
    }
}

// =============================================================================
// Channel Configuration
// =============================================================================

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// `layout` is a text pattern
    #[default]
    Text,
    /// `layout` is a list of `key=%x` items rendered as a JSON object
    Json,
}

/// One `[[channels]]` entry, selected by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelConfig {
    Console(ConsoleConfig),
    File(FileConfig),
    Elastic(ElasticConfig),
    Gelf(GelfConfig),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub level: Option<Level>,
    pub format: FormatKind,
    pub layout: Option<String>,
    /// Force colours on or off (default: only on a terminal)
    pub color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub level: Option<Level>,
    pub format: FormatKind,
    pub layout: Option<String>,
    /// Default `<exe name>.log`
    pub path: Option<PathBuf>,
    /// Rotation threshold; 0 disables rotation
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: FormatKind::Text,
            layout: None,
            path: None,
            max_bytes: 0,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    pub level: Option<Level>,
    /// JSON layout for documents
    pub layout: Option<String>,
    /// Base URL, e.g. `http://localhost:9200`
    pub url: String,
    /// Index prefix; the day is appended
    pub index: String,
    /// Extra attempts per request
    pub retry: usize,
    /// Records per bulk request
    pub batch: usize,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            level: None,
            layout: None,
            url: String::new(),
            index: String::new(),
            retry: 0,
            batch: DEFAULT_BULK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfConfig {
    pub level: Option<Level>,
    /// `udp://host:port` or `tcp://host:port`
    pub url: String,
    /// Reported host (default: first non-loopback IPv4)
    pub host: Option<String>,
    pub compress: CompressType,
    pub compress_level: u32,
    pub max_datagram_size: usize,
}

impl Default for GelfConfig {
    fn default() -> Self {
        Self {
            level: None,
            url: String::new(),
            host: None,
            compress: CompressType::None,
            compress_level: DEFAULT_COMPRESS_LEVEL,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl ChannelConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::Console(_) => "console",
            ChannelConfig::File(_) => "file",
            ChannelConfig::Elastic(_) => "elastic",
            ChannelConfig::Gelf(_) => "gelf",
        }
    }

    /// Construct the channel; layout and address errors surface here
    pub fn build(&self) -> Result<Arc<dyn Channel>> {
        match self {
            ChannelConfig::Console(c) => {
                let options = format_options(base_options(c.level), c.format, &c.layout)?;
                let mut channel = ConsoleChannel::new(options)?;
                if let Some(color) = c.color {
                    channel = channel.with_color(color);
                }
                Ok(Arc::new(channel))
            }
            ChannelConfig::File(c) => {
                let mut options = format_options(base_options(c.level), c.format, &c.layout)?
                    .with_rotation(c.max_bytes, c.max_files);
                if let Some(path) = &c.path {
                    options = options.with_path(path);
                }
                Ok(Arc::new(FileChannel::new(options)?))
            }
            ChannelConfig::Elastic(c) => {
                let options = format_options(base_options(c.level), FormatKind::Json, &c.layout)?
                    .with_url(&c.url)
                    .with_index(&c.index)
                    .with_retry(c.retry)
                    .with_batch(c.batch);
                Ok(Arc::new(ElasticChannel::new(options)?))
            }
            ChannelConfig::Gelf(c) => {
                let mut options = base_options(c.level)
                    .with_url(&c.url)
                    .with_compress(c.compress, c.compress_level)
                    .with_max_datagram_size(c.max_datagram_size);
                if let Some(host) = &c.host {
                    options = options.with_host(host);
                }
                Ok(Arc::new(GelfChannel::new(options)?))
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let url = match self {
            ChannelConfig::Elastic(c) => &c.url,
            ChannelConfig::Gelf(c) => &c.url,
            _ => return Ok(()),
        };
        if url.trim().is_empty() {
            return Err(LogError::ConfigValidation {
                field: "url",
                reason: format!("{} channel needs a url", self.kind()),
            });
        }
        Ok(())
    }
}

fn base_options(level: Option<Level>) -> ChannelOptions {
    ChannelOptions::new().with_level(level.unwrap_or(Level::Trace))
}

fn format_options(
    options: ChannelOptions,
    format: FormatKind,
    layout: &Option<String>,
) -> Result<ChannelOptions> {
    let layout = layout.as_deref().filter(|l| !l.is_empty());
    Ok(match (format, layout) {
        (FormatKind::Text, Some(layout)) => options.with_layout(layout),
        (FormatKind::Text, None) => options,
        (FormatKind::Json, Some(layout)) => {
            options.with_formatter(Arc::new(JsonFormatter::new(layout)?))
        }
        (FormatKind::Json, None) => options.with_formatter(default_json_formatter()),
    })
}

// =============================================================================
// Load / build
// =============================================================================

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LogError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| LogError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `path` if given, else `logrelay.toml` when present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.asynchronous && self.max_queued == 0 {
            return Err(LogError::ConfigValidation {
                field: "max_queued",
                reason: "must be greater than 0 in async mode".into(),
            });
        }
        self.channels.iter().try_for_each(ChannelConfig::validate)
    }

    /// Build every channel and start the logger
    pub fn build(&self) -> Result<Logger> {
        self.validate()?;
        let mut builder = Logger::builder()
            .level(self.level)
            .asynchronous(self.asynchronous)
            .max_queued(self.max_queued)
            .disable_caller(self.disable_caller)
            .tags(self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if self.channels.is_empty() {
            builder = builder.channel(ConsoleChannel::new(ChannelOptions::new())?);
        }
        for channel in &self.channels {
            builder = builder.shared_channel(channel.build()?);
        }
        builder.build()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("logrelay-config-{}-{}-{}", tag, std::process::id(), ts))
    }

    #[test]
    fn test_config_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.level, Level::Trace);
        assert!(!config.asynchronous);
        assert_eq!(config.max_queued, DEFAULT_MAX_QUEUED);
        assert!(config.channels.is_empty());

        let logger = config.build().unwrap();
        assert_eq!(logger.channels().len(), 1);
        assert_eq!(logger.channels()[0].name(), "console");
    }

    #[test]
    fn test_config_full_file() {
        let text = r#"
level = "warn"
async = true
max_queued = 500

[tags]
env = "prod"
app = "api"

[[channels]]
kind = "console"
level = "error"
layout = "%m%n"
color = false

[[channels]]
kind = "file"
format = "json"
path = "logs/app.log"
max_bytes = 4096

[[channels]]
kind = "gelf"
url = "tcp://127.0.0.1:12201"
host = "web-1"
compress = "gzip"
compress_level = 6

[[channels]]
kind = "elastic"
url = "http://localhost:9200"
index = "svc"
retry = 2
"#;
        let config: Config = toml::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.level, Level::Warn);
        assert!(config.asynchronous);
        assert_eq!(config.max_queued, 500);
        assert_eq!(config.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(config.channels.len(), 4);

        let ChannelConfig::Console(console) = &config.channels[0] else {
            panic!("expected console");
        };
        assert_eq!(console.level, Some(Level::Error));
        assert_eq!(console.color, Some(false));

        let ChannelConfig::File(file) = &config.channels[1] else {
            panic!("expected file");
        };
        assert_eq!(file.format, FormatKind::Json);
        assert_eq!(file.max_bytes, 4096);
        assert_eq!(file.max_files, DEFAULT_MAX_FILES);

        let ChannelConfig::Gelf(gelf) = &config.channels[2] else {
            panic!("expected gelf");
        };
        assert_eq!(gelf.compress, CompressType::Gzip);
        assert_eq!(gelf.compress_level, 6);
        assert_eq!(gelf.max_datagram_size, DEFAULT_MAX_DATAGRAM_SIZE);

        let ChannelConfig::Elastic(elastic) = &config.channels[3] else {
            panic!("expected elastic");
        };
        assert_eq!(elastic.retry, 2);
        assert_eq!(elastic.batch, DEFAULT_BULK_SIZE);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let text = r#"
[[channels]]
kind = "syslog"
"#;
        assert!(toml::from_str::<Config>(text).is_err());
    }

    #[test]
    fn test_missing_url_rejected() {
        let config: Config = toml::from_str("[[channels]]\nkind = \"gelf\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(LogError::ConfigValidation { field: "url", .. })
        ));
    }

    #[test]
    fn test_bad_layout_surfaces_at_build() {
        let config: Config =
            toml::from_str("[[channels]]\nkind = \"console\"\nlayout = \"%q\"\n").unwrap();
        assert!(matches!(
            config.channels[0].build(),
            Err(LogError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_build_names_channels() {
        let dir = unique_temp_dir("build");
        let text = format!(
            r#"
level = "debug"

[[channels]]
kind = "console"
color = false

[[channels]]
kind = "file"
path = {:?}
"#,
            dir.join("app.log").to_string_lossy()
        );
        let config: Config = toml::from_str(&text).unwrap();
        let logger = config.build().unwrap();
        let names: Vec<&str> = logger.channels().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["console", "file"]);
        assert_eq!(logger.level(), Level::Debug);
        logger.stop().unwrap();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_errors() {
        let dir = unique_temp_dir("load");
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.toml");
        assert!(matches!(
            Config::load(&missing),
            Err(LogError::ConfigRead { .. })
        ));

        let broken = dir.join("broken.toml");
        fs::write(&broken, "level = [").unwrap();
        assert!(matches!(
            Config::load(&broken),
            Err(LogError::ConfigParse { .. })
        ));

        let good = dir.join("good.toml");
        fs::write(&good, "level = \"error\"\n").unwrap();
        assert_eq!(Config::load(&good).unwrap().level, Level::Error);
        let _ = fs::remove_dir_all(&dir);
    }
}
