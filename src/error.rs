//! Centralized error types for the logger
//!
//! All setup-time errors are represented by the `LogError` enum.
//! Steady-state logging never returns these to a call site: sinks report
//! transient failures through `tracing` and carry on.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LogError>`.

use std::fmt;
use std::path::PathBuf;

/// All logger errors
#[derive(Debug)]
pub enum LogError {
    // === Formatting ===
    /// Pattern layout could not be parsed
    InvalidLayout { layout: String, reason: String },
    /// Date format could not be parsed
    InvalidDateFormat { format: String },
    /// Time zone offset out of range or malformed
    InvalidTimeZone { zone: String },

    // === Network ===
    /// Remote address could not be parsed or resolved
    InvalidAddress { addr: String },
    /// URL scheme is neither `udp` nor `tcp`
    UnsupportedScheme { scheme: String },
    /// Failed to connect to a remote collector
    Connect {
        addr: String,
        source: std::io::Error,
    },
    /// A chunked message would need more chunks than the protocol allows
    MessageTooLarge { chunks: usize },
    /// Socket or stream write failed
    Send { source: std::io::Error },
    /// HTTP request failed
    Http { source: Box<reqwest::Error> },

    // === IO ===
    /// File system operation failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Sink could not be opened and will not accept records
    NotReady { channel: &'static str },

    // === Configuration ===
    /// Failed to read config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse config file
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Pipeline ===
    /// A filter rejected the record
    Filtered { reason: String },
    /// Background dispatch thread could not be started
    Spawn { source: std::io::Error },
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect { source, .. }
            | Self::Send { source }
            | Self::Io { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Spawn { source } => Some(source),
            Self::ConfigParse { source, .. } => Some(source),
            Self::Http { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLayout { layout, reason } => {
                write!(f, "Invalid layout {:?}: {}", layout, reason)
            }
            Self::InvalidDateFormat { format } => {
                write!(f, "Unsupported date format: {}", format)
            }
            Self::InvalidTimeZone { zone } => write!(f, "Invalid time zone: {}", zone),
            Self::InvalidAddress { addr } => write!(f, "Invalid address: {}", addr),
            Self::UnsupportedScheme { scheme } => {
                write!(f, "Unsupported scheme: {} (expected udp or tcp)", scheme)
            }
            Self::Connect { addr, .. } => write!(f, "Cannot connect to {}", addr),
            Self::MessageTooLarge { chunks } => {
                write!(f, "Message too large, would need {} chunks", chunks)
            }
            Self::Send { source } => write!(f, "Send failed: {}", source),
            Self::Http { source } => write!(f, "HTTP request failed: {}", source),
            Self::Io { path, .. } => write!(f, "IO error: {}", path.display()),
            Self::NotReady { channel } => write!(f, "Channel not ready: {}", channel),
            Self::ConfigRead { path, .. } => {
                write!(f, "Cannot read config: {}", path.display())
            }
            Self::ConfigParse { path, source } => {
                write!(f, "Invalid config {}: {}", path.display(), source)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Filtered { reason } => write!(f, "Record filtered: {}", reason),
            Self::Spawn { source } => write!(f, "Cannot start dispatch thread: {}", source),
        }
    }
}

/// Alias for Result with LogError
pub type Result<T> = std::result::Result<T, LogError>;
