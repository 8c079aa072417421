//! Console channel: stdout, coloured by level on a terminal

use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::QueueableCommand;
use std::io::{self, IsTerminal, Write};

use super::{Channel, ChannelBase, ChannelOptions};
use crate::error::Result;
use crate::format::default_text_formatter;
use crate::level::Level;
use crate::record::RecordRef;

pub struct ConsoleChannel {
    base: ChannelBase,
    color: bool,
}

impl ConsoleChannel {
    pub fn new(options: ChannelOptions) -> Result<Self> {
        let formatter = options.resolve_formatter(default_text_formatter)?;
        Ok(Self {
            base: ChannelBase::new(options.level, formatter),
            color: io::stdout().is_terminal(),
        })
    }

    /// Force colours on or off
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn emit(&self, out: &mut impl Write, level: Level, text: &[u8]) -> io::Result<()> {
        if self.color {
            out.queue(SetForegroundColor(level_color(level)))?;
        }
        out.write_all(text)?;
        if text.last() != Some(&b'\n') {
            out.write_all(b"\n")?;
        }
        if self.color {
            out.queue(ResetColor)?;
        }
        out.flush()
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace | Level::Debug => Color::Blue,
        Level::Info => Color::Cyan,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
        Level::Fatal | Level::Panic => Color::Magenta,
    }
}

impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn level(&self) -> Level {
        self.base.level()
    }

    fn set_level(&self, level: Level) {
        self.base.set_level(level)
    }

    fn write(&self, record: &RecordRef) {
        let Some(text) = self.base.format(record) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let _ = self.emit(&mut io::stdout().lock(), record.level(), &text);
    }
}
