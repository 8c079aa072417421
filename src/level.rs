//! Log levels
//!
//! `Level` is ordered by severity: `Trace < Debug < ... < Panic`.
//! A threshold accepts every level at least as severe as itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

/// Severity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    Panic = 6,
}

/// Syslog severity (RFC 5424), used by the GELF envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyslogLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Level {
    /// All levels, least severe first
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// Upper-case name as written by formatters
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }

    /// Whether a record at `level` passes a threshold of `self`
    #[inline]
    pub fn accepts(self, level: Level) -> bool {
        level >= self
    }

    pub fn to_syslog(self) -> SyslogLevel {
        match self {
            Level::Panic => SyslogLevel::Alert,
            Level::Fatal => SyslogLevel::Critical,
            Level::Error => SyslogLevel::Error,
            Level::Warn => SyslogLevel::Warning,
            Level::Info => SyslogLevel::Informational,
            Level::Debug | Level::Trace => SyslogLevel::Debug,
        }
    }

    #[inline]
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) fn from_u8(v: u8) -> Level {
        Level::ALL
            .get(v as usize)
            .copied()
            .unwrap_or(Level::Panic)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            other => Err(LogError::ConfigValidation {
                field: "level",
                reason: format!("unknown level {:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_accepts_more_severe() {
        assert!(Level::Info.accepts(Level::Info));
        assert!(Level::Info.accepts(Level::Error));
        assert!(!Level::Info.accepts(Level::Debug));
        assert!(Level::Trace.accepts(Level::Trace));
        assert!(!Level::Panic.accepts(Level::Fatal));
    }

    #[test]
    fn test_syslog_mapping() {
        assert_eq!(Level::Panic.to_syslog() as u8, 1);
        assert_eq!(Level::Fatal.to_syslog() as u8, 2);
        assert_eq!(Level::Error.to_syslog() as u8, 3);
        assert_eq!(Level::Warn.to_syslog() as u8, 4);
        assert_eq!(Level::Info.to_syslog() as u8, 6);
        assert_eq!(Level::Debug.to_syslog() as u8, 7);
        assert_eq!(Level::Trace.to_syslog() as u8, 7);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!(" warning ".parse::<Level>().unwrap(), Level::Warn);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_u8_roundtrip() {
        for lv in Level::ALL {
            assert_eq!(Level::from_u8(lv.to_u8()), lv);
        }
    }
}
