//! Flat JSON object encoder over a pooled `Buffer`
//!
//! Keys and values are escaped by `serde_json`; the encoder itself only
//! tracks separators, so objects are written in one pass with no tree.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::Buffer;
use crate::field::Field;

/// `prefix + key` serialized as one JSON string without concatenating first
struct Prefixed<'a>(&'a str, &'a str);

impl Serialize for Prefixed<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}{}", self.0, self.1))
    }
}

pub struct JsonEncoder {
    buf: Buffer,
    first: bool,
}

impl JsonEncoder {
    /// Start a new object
    pub fn begin() -> Self {
        let mut buf = Buffer::new();
        buf.append_byte(b'{');
        Self { buf, first: true }
    }

    /// Close the object and hand out the bytes
    pub fn finish(mut self) -> Bytes {
        self.buf.append_byte(b'}');
        self.buf.into_bytes()
    }

    pub fn add_str(&mut self, key: &str, value: &str) {
        self.add_value(key, value);
    }

    /// Add only when `value` is non-empty
    pub fn add_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.add_str(key, value);
        }
    }

    pub fn add_i64(&mut self, key: &str, value: i64) {
        self.key(key);
        self.buf.append_int(value);
    }

    pub fn add_u64(&mut self, key: &str, value: u64) {
        self.key(key);
        self.buf.append_uint(value);
    }

    pub fn add_f64(&mut self, key: &str, value: f64) {
        self.add_value(key, &value);
    }

    /// Add a typed field, optionally renaming its key
    pub fn add_field(&mut self, field: &Field, prefix: &str) {
        if prefix.is_empty() {
            self.add_value(&field.key, &field.value);
        } else {
            self.key_prefixed(prefix, &field.key);
            self.write(&field.value);
        }
    }

    /// Add a string under `prefix + key`
    pub fn add_str_prefixed(&mut self, prefix: &str, key: &str, value: &str) {
        self.key_prefixed(prefix, key);
        self.write(value);
    }

    fn add_value<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.key(key);
        self.write(value);
    }

    fn key(&mut self, key: &str) {
        self.separator();
        self.write(key);
        self.buf.append_byte(b':');
    }

    fn key_prefixed(&mut self, prefix: &str, key: &str) {
        self.separator();
        self.write(&Prefixed(prefix, key));
        self.buf.append_byte(b':');
    }

    fn separator(&mut self) {
        if self.first {
            self.first = false;
        } else {
            self.buf.append_byte(b',');
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, value: &T) {
        // Writing into an in-memory buffer only fails for maps with
        // non-string keys, which are never produced here.
        let _ = serde_json::to_writer(&mut self.buf, value);
    }
}
