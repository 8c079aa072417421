//! Pattern layout
//!
//! log4j-style patterns: literal text mixed with `%[-min][.max]key[{param}]`
//! actions.
//!
//! | key | output |
//! |-----|--------|
//! | `%` | literal `%` |
//! | `n` | newline |
//! | `m` | message |
//! | `p` | level name |
//! | `F` | caller file name |
//! | `L` | caller line |
//! | `M` | caller module |
//! | `l` | `module(file:line)` |
//! | `d` | time, `{param}` is a `DateFormat` |
//! | `x` | tags: `{*}` all as `k=v`, `{name}` one value |
//! | `w` | fields as `k=v` |
//!
//! `max > 0` truncates to the last `max` characters; a negative `min` pads on
//! the right, a positive one on the left.

use crate::buffer::Buffer;
use crate::constants::MAX_LAYOUT_WIDTH;
use crate::error::{LogError, Result};
use crate::record::RecordRef;

use super::date::DateFormat;

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Percent,
    Newline,
    Message,
    Level,
    File,
    Line,
    Module,
    Location,
    Date(DateFormat),
    AllTags,
    Tag(String),
    Fields,
}

#[derive(Debug, Clone, PartialEq)]
struct Action {
    prefix: String,
    min: isize,
    max: usize,
    key: Option<Key>,
}

/// Parsed pattern layout
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    actions: Vec<Action>,
}

impl Layout {
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut lex = Lexer::new(pattern);
        let mut actions = Vec::with_capacity(8);
        while !lex.eof() {
            let prefix = lex.read_prefix();
            if lex.eof() && !lex.after_percent {
                if !prefix.is_empty() {
                    actions.push(Action {
                        prefix,
                        min: 0,
                        max: 0,
                        key: None,
                    });
                }
                break;
            }

            let min = lex.read_number()?;
            let max = if lex.read_expect('.') {
                let max = lex.read_number()?;
                usize::try_from(max).map_err(|_| lex.error(format!("invalid max {}", max)))?
            } else {
                0
            };
            let key_char = lex.read_key().ok_or_else(|| lex.error("missing key".into()))?;
            let param = if lex.read_expect('{') {
                Some(lex.read_close_term('}')?)
            } else {
                None
            };

            let key = match key_char {
                '%' => Key::Percent,
                'n' => Key::Newline,
                'm' => Key::Message,
                'p' => Key::Level,
                'F' => Key::File,
                'L' => Key::Line,
                'M' => Key::Module,
                'l' => Key::Location,
                'd' => Key::Date(DateFormat::parse(param.as_deref().unwrap_or(""))?),
                'x' => match param.as_deref() {
                    None | Some("") | Some("*") => Key::AllTags,
                    Some(name) => Key::Tag(name.to_string()),
                },
                'w' => Key::Fields,
                other => return Err(lex.error(format!("unknown key '{}'", other))),
            };
            actions.push(Action {
                prefix,
                min,
                max,
                key: Some(key),
            });
        }
        Ok(Self { actions })
    }

    /// Single-action key of a layout such as `%m`, used to name JSON keys
    pub(crate) fn sole_key_name(&self) -> Option<&'static str> {
        match self.actions.as_slice() {
            [Action {
                prefix, key: Some(key), ..
            }] if prefix.is_empty() => Some(match key {
                Key::Message => "msg",
                Key::Level => "level",
                Key::File => "file",
                Key::Line => "line",
                Key::Module => "method",
                Key::Location => "location",
                Key::Date(_) => "time",
                _ => return None,
            }),
            _ => None,
        }
    }

    /// Render `record` into `buf`
    pub fn render(&self, record: &RecordRef, buf: &mut Buffer) {
        let caller = record.caller();
        for action in &self.actions {
            buf.append_str(&action.prefix);
            let (min, max) = (action.min, action.max);
            let Some(key) = &action.key else { continue };
            match key {
                Key::Percent => buf.append_byte(b'%'),
                Key::Newline => buf.append_byte(b'\n'),
                Key::Message => buf.put(min, max, record.text()),
                Key::Level => buf.put(min, max, record.level().as_str()),
                Key::File => buf.put(min, max, caller.map(|c| c.file()).unwrap_or("")),
                Key::Line => buf.put_fmt(
                    min,
                    max,
                    format_args!("{}", caller.map(|c| c.line()).unwrap_or(0)),
                ),
                Key::Module => buf.put(min, max, caller.and_then(|c| c.module()).unwrap_or("")),
                Key::Location => match caller {
                    Some(c) => buf.put_fmt(
                        min,
                        max,
                        format_args!("{}({}:{})", c.module().unwrap_or(""), c.file(), c.line()),
                    ),
                    None => buf.put(min, max, "(:0)"),
                },
                Key::Date(df) => {
                    buf.put_fmt(min, max, format_args!("{}", df.display(record.time())))
                }
                Key::AllTags => {
                    for (k, v) in record.tags().iter() {
                        separate(buf);
                        buf.append_str(k);
                        buf.append_byte(b'=');
                        buf.append_str(v);
                    }
                }
                Key::Tag(name) => {
                    if let Some(v) = record.tags().get(name) {
                        buf.put(min, max, v);
                    }
                }
                Key::Fields => {
                    for field in record.fields() {
                        separate(buf);
                        buf.append_str(&field.key);
                        buf.append_byte(b'=');
                        field.value.append_to(buf);
                    }
                }
            }
        }
    }
}

/// Space between `k=v` pairs unless the output already ends in whitespace
fn separate(buf: &mut Buffer) {
    if !matches!(buf.last(), None | Some(b' ' | b'\t' | b'\n' | b'[' | b'(')) {
        buf.append_byte(b' ');
    }
}

// =============================================================================
// Lexer
// =============================================================================

struct Lexer<'a> {
    pattern: &'a str,
    pos: usize,
    after_percent: bool,
}

impl<'a> Lexer<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            after_percent: false,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn rest(&self) -> &'a str {
        &self.pattern[self.pos..]
    }

    fn error(&self, reason: String) -> LogError {
        LogError::InvalidLayout {
            layout: self.pattern.to_string(),
            reason,
        }
    }

    /// Literal text up to and including the next `%`
    fn read_prefix(&mut self) -> String {
        let rest = self.rest();
        match rest.find('%') {
            Some(idx) => {
                self.pos += idx + 1;
                self.after_percent = true;
                rest[..idx].to_string()
            }
            None => {
                self.pos = self.pattern.len();
                self.after_percent = false;
                rest.to_string()
            }
        }
    }

    fn read_expect(&mut self, ch: char) -> bool {
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    /// Optional signed decimal; absent means 0
    fn read_number(&mut self) -> Result<isize> {
        let rest = self.rest();
        let neg = rest.starts_with('-');
        let digits_start = usize::from(neg);
        let digits = rest[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - digits_start);
        if digits == 0 {
            if neg {
                return Err(self.error("sign without width".into()));
            }
            return Ok(0);
        }
        let text = &rest[..digits_start + digits];
        let value: isize = text
            .parse()
            .ok()
            .filter(|v: &isize| v.unsigned_abs() <= MAX_LAYOUT_WIDTH)
            .ok_or_else(|| self.error(format!("invalid width {}", text)))?;
        self.pos += text.len();
        Ok(value)
    }

    fn read_key(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.pos += ch.len_utf8();
        self.after_percent = false;
        Some(ch)
    }

    fn read_close_term(&mut self, close: char) -> Result<String> {
        let rest = self.rest();
        match rest.find(close) {
            Some(idx) => {
                self.pos += idx + close.len_utf8();
                Ok(rest[..idx].trim().to_string())
            }
            None => Err(self.error(format!("missing '{}' at offset {}", close, self.pos))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::level::Level;
    use crate::record::{Caller, RecordPool};
    use crate::tags::Tags;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn record() -> RecordRef {
        let pool = RecordPool::new(4);
        let mut b = pool.acquire();
        b.set_level(Level::Warn)
            .set_text("disk almost full")
            .set_time(chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .set_tags(Arc::new(Tags::from_pairs([("app", "api"), ("env", "prod")])))
            .push_field(Field::new("used", 97u32))
            .set_caller(Caller::here().with_module("logrelay::disk"));
        b.freeze()
    }

    fn render(pattern: &str, record: &RecordRef) -> String {
        let layout = Layout::parse(pattern).unwrap();
        let mut buf = Buffer::new();
        layout.render(record, &mut buf);
        String::from_utf8(buf.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_message_level_and_widths() {
        let r = record();
        assert_eq!(render("[%-5p] %m%n", &r), "[WARN ] disk almost full\n");
        assert_eq!(render("%6p|%.4m", &r), "  WARN|full");
        assert_eq!(render("100%%", &r), "100%");
    }

    #[test]
    fn test_date_and_caller() {
        let r = record();
        assert_eq!(render("%d{yyyy-MM-dd HH:mm:ss;UTC}", &r), "2024-01-02 03:04:05");
        assert_eq!(render("%F %M", &r), "layout.rs disk");
        assert!(render("%l", &r).starts_with("disk(layout.rs:"));
    }

    #[test]
    fn test_tags_and_fields() {
        let r = record();
        assert_eq!(render("%x{*}", &r), "app=api env=prod");
        assert_eq!(render("%x{env}|%x{none}", &r), "prod|");
        assert_eq!(render("%w", &r), "used=97");
        assert_eq!(render("%x{*}%w", &r), "app=api env=prod used=97");
    }

    #[test]
    fn test_missing_caller_renders_empty() {
        let pool = RecordPool::new(1);
        let r = pool.acquire().freeze();
        assert_eq!(render("%F:%L", &r), ":0");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["%", "%d{yyyy", "%q", "%-p", "%5.-3m"] {
            assert!(
                matches!(Layout::parse(bad), Err(LogError::InvalidLayout { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_width_is_bounded() {
        for bad in ["%999999999999m", "%-5000p", "%.4097m", "%99999999999999999999999m"] {
            assert!(
                matches!(Layout::parse(bad), Err(LogError::InvalidLayout { .. })),
                "{:?} should be rejected",
                bad
            );
        }
        let r = record();
        assert_eq!(render("%4096m", &r).len(), 4096);
        assert_eq!(render("%-4096.4096p", &r).trim_end(), "WARN");
    }

    #[test]
    fn test_sole_key_name() {
        assert_eq!(Layout::parse("%m").unwrap().sole_key_name(), Some("msg"));
        assert_eq!(Layout::parse("x%m").unwrap().sole_key_name(), None);
    }
}
