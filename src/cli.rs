//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::Parser;
use std::path::PathBuf;

use crate::level::Level;

// =============================================================================
// CLI Definition
// =============================================================================

/// Pipe stdin lines into structured log channels (console, file, GELF, Elastic)
#[derive(Parser, Debug, Default)]
#[command(name = "logrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./logrelay.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Level given to every input line
    #[arg(short, long, default_value = "info")]
    pub level: Level,

    /// Extra tag attached to every record (repeatable)
    #[arg(short, long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Also forward to a GELF collector (udp://host:port or tcp://host:port)
    #[arg(long, value_name = "URL")]
    pub gelf: Option<String>,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", s)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["logrelay"]);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert_eq!(cli.level, Level::Info);
        assert!(cli.tags.is_empty());
        assert!(cli.gelf.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["logrelay", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["logrelay", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_level_and_config() {
        let cli = Cli::parse_from(["logrelay", "--level", "warn", "-c", "app.toml"]);
        assert_eq!(cli.level, Level::Warn);
        assert_eq!(cli.config, Some(PathBuf::from("app.toml")));
        assert!(Cli::try_parse_from(["logrelay", "--level", "loud"]).is_err());
    }

    #[test]
    fn test_cli_parse_tags() {
        let cli = Cli::parse_from(["logrelay", "-t", "env=prod", "--tag", "svc=api=v2"]);
        assert_eq!(
            cli.tags,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("svc".to_string(), "api=v2".to_string()),
            ]
        );
        assert!(Cli::try_parse_from(["logrelay", "--tag", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["logrelay", "--tag", "=x"]).is_err());
    }

    #[test]
    fn test_cli_parse_gelf() {
        let cli = Cli::parse_from(["logrelay", "--gelf", "udp://127.0.0.1:12201"]);
        assert_eq!(cli.gelf.as_deref(), Some("udp://127.0.0.1:12201"));
    }
}
