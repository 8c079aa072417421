//! Typed key/value fields attached to a record

use serde::ser::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::buffer::Buffer;

/// Value of a structured field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(Cow<'static, str>),
    Bool(bool),
    Byte(u8),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    /// Arbitrary value rendered with `Display` at the call site
    Any(String),
}

/// One key/value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Field whose value is the `Display` rendering of `value`
    pub fn any(key: impl Into<Cow<'static, str>>, value: impl fmt::Display) -> Self {
        Self::new(key, FieldValue::Any(value.to_string()))
    }
}

impl FieldValue {
    /// Append the bare value (strings unquoted) to a text buffer
    pub fn append_to(&self, buf: &mut Buffer) {
        match self {
            FieldValue::Str(s) => buf.append_str(s),
            FieldValue::Any(s) => buf.append_str(s),
            FieldValue::Bool(v) => buf.append_bool(*v),
            FieldValue::Byte(v) => buf.append_byte(*v),
            FieldValue::Int(v) => buf.append_int(*v),
            FieldValue::Uint(v) => buf.append_uint(*v),
            FieldValue::F32(v) => buf.append_f32(*v),
            FieldValue::F64(v) => buf.append_f64(*v),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Any(s) => serializer.serialize_str(s),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Byte(v) => serializer.serialize_char(char::from(*v)),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Uint(v) => serializer.serialize_u64(*v),
            FieldValue::F32(v) => serializer.serialize_f32(*v),
            FieldValue::F64(v) => serializer.serialize_f64(*v),
        }
    }
}

impl From<&'static str> for FieldValue {
    fn from(v: &'static str) -> Self {
        FieldValue::Str(Cow::Borrowed(v))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(Cow::Owned(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Byte(v)
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64, isize);
impl_from_int!(Uint, u64: u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::F32(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Field::new("a", 3i32).value, FieldValue::Int(3));
        assert_eq!(Field::new("a", 3usize).value, FieldValue::Uint(3));
        assert_eq!(Field::new("a", "x").value, FieldValue::Str("x".into()));
        assert_eq!(Field::any("a", 1.5).value, FieldValue::Any("1.5".into()));
    }

    #[test]
    fn test_append_to_text() {
        let mut b = Buffer::new();
        FieldValue::from(404u16).append_to(&mut b);
        b.append_byte(b' ');
        FieldValue::from("GET").append_to(&mut b);
        b.append_byte(b' ');
        FieldValue::from(false).append_to(&mut b);
        assert_eq!(b.as_bytes(), b"404 GET false");
    }

    #[test]
    fn test_serialize_native_json_types() {
        let json = serde_json::to_string(&vec![
            FieldValue::Int(-1),
            FieldValue::Bool(true),
            FieldValue::from("s"),
            FieldValue::Byte(b'x'),
        ])
        .unwrap();
        assert_eq!(json, r#"[-1,true,"s","x"]"#);
    }
}
