//! GELF UDP chunking
//!
//! A payload larger than one datagram is split into at most 128 chunks.
//! Every chunk starts with a 12-byte header (single bytes, no byte order):
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0 | 2 | magic `0x1e 0x1f` |
//! | 2 | 8 | message id, shared by all chunks of a message |
//! | 10 | 1 | sequence number |
//! | 11 | 1 | total chunk count |
//!
//! followed by up to `max_datagram - 12` bytes of payload. Chunks are not
//! acknowledged; losing one loses the message at the receiver.

use rand::Rng;

use super::Transport;
use crate::constants::{CHUNK_HEADER_LEN, MAGIC_CHUNKED, MAX_CHUNKS};
use crate::error::{LogError, Result};

/// Fixed-size chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader([u8; CHUNK_HEADER_LEN]);

impl ChunkHeader {
    pub fn new(message_id: [u8; 8], seq: u8, total: u8) -> Self {
        let mut raw = [0u8; CHUNK_HEADER_LEN];
        raw[..2].copy_from_slice(&MAGIC_CHUNKED);
        raw[2..10].copy_from_slice(&message_id);
        raw[10] = seq;
        raw[11] = total;
        Self(raw)
    }

    /// Split a received datagram into header and payload
    pub fn parse(packet: &[u8]) -> Option<(Self, &[u8])> {
        if packet.len() < CHUNK_HEADER_LEN || packet[..2] != MAGIC_CHUNKED {
            return None;
        }
        let mut raw = [0u8; CHUNK_HEADER_LEN];
        raw.copy_from_slice(&packet[..CHUNK_HEADER_LEN]);
        Some((Self(raw), &packet[CHUNK_HEADER_LEN..]))
    }

    pub fn message_id(&self) -> [u8; 8] {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[2..10]);
        id
    }

    pub fn seq(&self) -> u8 {
        self.0[10]
    }

    pub fn total(&self) -> u8 {
        self.0[11]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Payload bytes carried by one chunk
#[inline]
fn chunk_data_len(max_datagram: usize) -> usize {
    max_datagram.saturating_sub(CHUNK_HEADER_LEN).max(1)
}

/// Chunks needed for `len` payload bytes
pub fn chunk_count(len: usize, max_datagram: usize) -> usize {
    len.div_ceil(chunk_data_len(max_datagram)).max(1)
}

/// Iterator over the chunks of one message
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a [u8],
    message_id: [u8; 8],
    data_len: usize,
    seq: u8,
    total: u8,
}

impl<'a> Chunks<'a> {
    /// Plan the chunks of `data`; fails when more than 128 would be needed
    pub fn new(data: &'a [u8], max_datagram: usize, message_id: [u8; 8]) -> Result<Self> {
        if max_datagram <= CHUNK_HEADER_LEN {
            return Err(LogError::ConfigValidation {
                field: "max_datagram_size",
                reason: format!("must exceed the {}-byte chunk header", CHUNK_HEADER_LEN),
            });
        }
        let total = chunk_count(data.len(), max_datagram);
        if total > MAX_CHUNKS {
            return Err(LogError::MessageTooLarge { chunks: total });
        }
        Ok(Self {
            rest: data,
            message_id,
            data_len: chunk_data_len(max_datagram),
            seq: 0,
            total: total as u8,
        })
    }

    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn message_id(&self) -> [u8; 8] {
        self.message_id
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = (ChunkHeader, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.seq >= self.total {
            return None;
        }
        let n = self.data_len.min(self.rest.len());
        let (payload, rest) = self.rest.split_at(n);
        self.rest = rest;
        let header = ChunkHeader::new(self.message_id, self.seq, self.total);
        self.seq += 1;
        Some((header, payload))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.seq) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Send `data` as chunked datagrams under a fresh random message id
///
/// The chunk count is checked before anything is sent, so an oversize
/// message has no side effects. Returns the number of chunks sent.
pub fn send_chunked(transport: &mut dyn Transport, data: &[u8], max_datagram: usize) -> Result<usize> {
    let mut message_id = [0u8; 8];
    rand::rng().fill(&mut message_id);
    let chunks = Chunks::new(data, max_datagram, message_id)?;
    let total = chunks.len();
    for (header, payload) in chunks {
        transport
            .send_parts(&[header.as_bytes(), payload])
            .map_err(|e| LogError::Send { source: e })?;
    }
    Ok(total)
}
