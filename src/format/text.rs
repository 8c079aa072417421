//! Text and JSON formatters built on `Layout`

use bytes::Bytes;

use super::json::JsonEncoder;
use super::layout::Layout;
use super::Formatter;
use crate::buffer::Buffer;
use crate::constants::{DEFAULT_JSON_LAYOUT, DEFAULT_TEXT_LAYOUT};
use crate::error::{LogError, Result};
use crate::record::RecordRef;

// =============================================================================
// Text
// =============================================================================

/// Renders records through a pattern layout
#[derive(Debug, Clone)]
pub struct TextFormatter {
    layout: Layout,
}

impl TextFormatter {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            layout: Layout::parse(pattern)?,
        })
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_LAYOUT).expect("default text layout is valid")
    }
}

impl Formatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn format(&self, record: &RecordRef) -> Result<Bytes> {
        let mut buf = Buffer::new();
        self.layout.render(record, &mut buf);
        Ok(buf.into_bytes())
    }
}

// =============================================================================
// JSON
// =============================================================================

/// Renders records as one flat JSON object
///
/// The layout is a space-separated list of `key=%x` pairs; values may be
/// double-quoted to contain spaces (`time="%d{yyyy-MM-dd HH:mm:ss}"`).
/// Every configured value is written as a string, empty values are skipped.
/// `%x` and `%w` entries are ignored: tags and fields are always appended,
/// fields keeping their native JSON type.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    fields: Vec<(String, Layout)>,
}

impl JsonFormatter {
    pub fn new(layout: &str) -> Result<Self> {
        let invalid = |reason: String| LogError::InvalidLayout {
            layout: layout.to_string(),
            reason,
        };

        let mut fields = Vec::new();
        for item in split_items(layout) {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => ("", item.trim()),
            };
            let value = value.trim_matches('"');
            let mut chars = value.chars();
            if chars.next() != Some('%') {
                return Err(invalid(format!("expected %key in {:?}", item)));
            }
            match chars.next() {
                Some('x') | Some('w') => continue,
                Some(_) => {}
                None => return Err(invalid(format!("missing key in {:?}", item))),
            }

            let pattern = Layout::parse(value)?;
            let key = if key.is_empty() {
                pattern
                    .sole_key_name()
                    .ok_or_else(|| invalid(format!("missing name for {:?}", value)))?
                    .to_string()
            } else {
                key.to_string()
            };
            fields.push((key, pattern));
        }
        Ok(Self { fields })
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_JSON_LAYOUT).expect("default json layout is valid")
    }
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn format(&self, record: &RecordRef) -> Result<Bytes> {
        let mut enc = JsonEncoder::begin();
        let mut scratch = Buffer::new();
        for (key, layout) in &self.fields {
            scratch.clear();
            layout.render(record, &mut scratch);
            enc.add_non_empty(key, &String::from_utf8_lossy(scratch.as_bytes()));
        }
        for (key, value) in record.tags().iter() {
            enc.add_str(key, value);
        }
        for field in record.fields() {
            enc.add_field(field, "");
        }
        Ok(enc.finish())
    }
}

/// Split on spaces outside double quotes and `{}` parameters
fn split_items(layout: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = None;
    let mut quoted = false;
    let mut depth = 0usize;
    for (i, c) in layout.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && !quoted && depth == 0 => {
                if let Some(s) = start.take() {
                    items.push(&layout[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        items.push(&layout[s..]);
    }
    items
}
