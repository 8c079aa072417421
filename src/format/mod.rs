//! Record formatting
//!
//! A `Formatter` turns a frozen record into bytes. Formatters must be
//! deterministic: `RecordRef::formatted` caches the output per formatter
//! instance, so every sink sharing a formatter reuses one rendering.
//!
//! - `TextFormatter`: log4j-style pattern layout (`%-5p %d %m%n`)
//! - `JsonFormatter`: flat JSON object built from `key=%x` pairs

mod date;
mod json;
mod layout;
mod text;

pub use date::{DateDisplay, DateFormat};
pub use json::JsonEncoder;
pub use layout::Layout;
pub use text::{JsonFormatter, TextFormatter};

use bytes::Bytes;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::record::RecordRef;

/// Renders a record to bytes
pub trait Formatter: Send + Sync {
    fn name(&self) -> &str;

    fn format(&self, record: &RecordRef) -> Result<Bytes>;
}

/// Identity of a formatter instance, used as the record cache key
#[inline]
pub(crate) fn formatter_key(formatter: &Arc<dyn Formatter>) -> usize {
    Arc::as_ptr(formatter) as *const () as usize
}

/// Shared text formatter with the default layout
pub fn default_text_formatter() -> Arc<dyn Formatter> {
    static DEFAULT: OnceLock<Arc<dyn Formatter>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(TextFormatter::default()))
        .clone()
}

/// Shared JSON formatter with the default layout
pub fn default_json_formatter() -> Arc<dyn Formatter> {
    static DEFAULT: OnceLock<Arc<dyn Formatter>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(JsonFormatter::default()))
        .clone()
}
