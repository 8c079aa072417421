//! Payload compression for UDP messages

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{self, Write};

/// Compression applied to UDP payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressType {
    #[default]
    None,
    Gzip,
    Zlib,
}

/// Compress `data` at `level` (0-9); `None` borrows the input unchanged
pub fn compress(data: &[u8], kind: CompressType, level: u32) -> io::Result<Cow<'_, [u8]>> {
    if kind == CompressType::None {
        return Ok(Cow::Borrowed(data));
    }
    let level = Compression::new(level.min(9));
    let out = Vec::with_capacity(data.len() / 2 + 32);
    let out = match kind {
        CompressType::None => out,
        CompressType::Gzip => {
            let mut enc = GzEncoder::new(out, level);
            enc.write_all(data)?;
            enc.finish()?
        }
        CompressType::Zlib => {
            let mut enc = ZlibEncoder::new(out, level);
            enc.write_all(data)?;
            enc.finish()?
        }
    };
    Ok(Cow::Owned(out))
}
