//! logrelay - forward stdin lines to structured log channels
//!
//! Usage:
//!   some-app | logrelay                       Console output (or ./logrelay.toml)
//!   some-app | logrelay -c relay.toml         Channels from a config file
//!   some-app | logrelay --gelf udp://gl:12201 Also ship to a GELF collector
//!
//! Stops on end of input or Ctrl-C, then drains queued records.

use clap::Parser;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use logrelay::cli::Cli;
use logrelay::config::{ChannelConfig, Config, GelfConfig};
use logrelay::Logger;

type BoxError = Box<dyn std::error::Error>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logrelay::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("logrelay: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BoxError> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.tags.extend(cli.tags.iter().cloned());
    if let Some(url) = &cli.gelf {
        config.channels.push(ChannelConfig::Gelf(GelfConfig {
            url: url.clone(),
            ..GelfConfig::default()
        }));
    }
    let logger = Arc::new(config.build()?);
    tracing::debug!("{:?}", logger);

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<usize>();
    let reader = Arc::clone(&logger);
    let level = cli.level;
    thread::Builder::new()
        .name("logrelay-stdin".to_string())
        .spawn(move || {
            let _ = done_tx.send(pump_stdin(&reader, level));
        })?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let lines = rt.block_on(async {
        tokio::select! {
            lines = done_rx => lines.ok(),
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                None
            }
        }
    });

    logger.stop()?;
    if let Some(lines) = lines {
        tracing::debug!("{} lines relayed", lines);
    }
    if let Some(stats) = logger.dispatch_stats() {
        if stats.dropped() > 0 {
            tracing::warn!("{} records dropped (queue full)", stats.dropped());
        }
    }
    Ok(())
}

fn pump_stdin(logger: &Logger, level: logrelay::Level) -> usize {
    let stdin = std::io::stdin();
    let mut count = 0;
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                logger.log(level, line.trim_end(), None);
                count += 1;
            }
            Err(e) => {
                tracing::warn!("stdin: {}", e);
                break;
            }
        }
    }
    count
}
