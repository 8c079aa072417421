//! GELF channel (Graylog Extended Log Format)
//!
//! Each record becomes one flat JSON envelope:
//!
//! ```text
//! {"version":"1.1","host":"10.0.0.5","short_message":"...","full_message":"...",
//!  "timestamp":1700000000.123,"level":4,"_file":"db.rs","_line":42,"_env":"prod"}
//! ```
//!
//! - **UDP**: the envelope is optionally compressed (gzip/zlib) and sent as
//!   one datagram, or chunked when larger than `max_datagram_size`
//! - **TCP**: the plain envelope followed by a `0x00` delimiter
//!
//! The connection is opened on `open()` or lazily on the first write, then
//! reused. A failed connect is reported once; the channel then drops records
//! until `open()` is called again.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Channel, ChannelBase, ChannelOptions};
use crate::constants::{CHUNK_HEADER_LEN, GELF_VERSION};
use crate::error::{LogError, Result};
use crate::format::{Formatter, JsonEncoder};
use crate::level::Level;
use crate::record::RecordRef;
use crate::transport::{
    compress, local_ipv4, send_chunked, CompressType, RemoteAddr, Scheme, Transport,
};

/// Renders the GELF envelope; extra keys are prefixed with `_`
#[derive(Debug, Clone)]
pub struct GelfFormatter {
    host: String,
}

impl GelfFormatter {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Formatter for GelfFormatter {
    fn name(&self) -> &str {
        "gelf"
    }

    fn format(&self, record: &RecordRef) -> Result<Bytes> {
        let mut enc = JsonEncoder::begin();
        enc.add_str("version", GELF_VERSION);
        enc.add_str("host", &self.host);
        enc.add_str("short_message", record.text());
        enc.add_str("full_message", record.text());
        enc.add_f64(
            "timestamp",
            record.time().timestamp_millis() as f64 / 1000.0,
        );
        enc.add_u64("level", record.level().to_syslog() as u64);
        if let Some(caller) = record.caller() {
            enc.add_str("_file", caller.file());
            enc.add_u64("_line", u64::from(caller.line()));
            enc.add_non_empty("_method", caller.module().unwrap_or(""));
        }
        for (key, value) in record.tags().iter() {
            enc.add_str_prefixed("_", key, value);
        }
        for field in record.fields() {
            enc.add_field(field, "_");
        }
        Ok(enc.finish())
    }
}

enum Link {
    /// Not connected yet; the next write connects
    Idle,
    Connected(Box<dyn Transport>),
    /// Connect failed or channel closed; writes are dropped until `open()`
    Down,
}

pub struct GelfChannel {
    base: ChannelBase,
    addr: RemoteAddr,
    compress_type: CompressType,
    compress_level: u32,
    max_datagram: usize,
    link: Mutex<Link>,
}

impl GelfChannel {
    pub fn new(options: ChannelOptions) -> Result<Self> {
        let addr: RemoteAddr = options.url.parse()?;
        if options.max_datagram_size <= CHUNK_HEADER_LEN {
            return Err(LogError::ConfigValidation {
                field: "max_datagram_size",
                reason: format!("{} is too small", options.max_datagram_size),
            });
        }
        let formatter: Arc<dyn Formatter> = match &options.formatter {
            Some(f) => Arc::clone(f),
            None => {
                let host = options
                    .host
                    .clone()
                    .filter(|h| !h.is_empty())
                    .or_else(|| local_ipv4().map(|ip| ip.to_string()))
                    .unwrap_or_else(|| "localhost".to_string());
                Arc::new(GelfFormatter::new(host))
            }
        };
        Ok(Self {
            base: ChannelBase::new(options.level, formatter),
            addr,
            compress_type: options.compress_type,
            compress_level: options.compress_level,
            max_datagram: options.max_datagram_size,
            link: Mutex::new(Link::Idle),
        })
    }

    pub fn addr(&self) -> &RemoteAddr {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.link.lock(), Link::Connected(_))
    }

    fn connect(&self, link: &mut Link) -> Result<()> {
        match self.addr.connect() {
            Ok(transport) => {
                tracing::debug!("gelf: connected to {}", self.addr);
                *link = Link::Connected(transport);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("gelf: {}", e);
                *link = Link::Down;
                Err(e)
            }
        }
    }

    fn send(&self, transport: &mut dyn Transport, envelope: &[u8]) -> Result<()> {
        match self.addr.scheme {
            Scheme::Tcp => transport
                .send(envelope)
                .map_err(|e| LogError::Send { source: e }),
            Scheme::Udp => {
                let payload = compress(envelope, self.compress_type, self.compress_level)
                    .map_err(|e| LogError::Send { source: e })?;
                if payload.len() <= self.max_datagram {
                    transport
                        .send(&payload)
                        .map_err(|e| LogError::Send { source: e })
                } else {
                    send_chunked(transport, &payload, self.max_datagram).map(|_| ())
                }
            }
        }
    }
}

impl Channel for GelfChannel {
    fn name(&self) -> &str {
        "gelf"
    }

    fn level(&self) -> Level {
        self.base.level()
    }

    fn set_level(&self, level: Level) {
        self.base.set_level(level)
    }

    fn open(&self) -> Result<()> {
        let mut link = self.link.lock();
        if matches!(*link, Link::Connected(_)) {
            return Ok(());
        }
        self.connect(&mut link)
    }

    fn close(&self) -> Result<()> {
        *self.link.lock() = Link::Down;
        Ok(())
    }

    fn write(&self, record: &RecordRef) {
        let Some(envelope) = self.base.format(record) else {
            return;
        };

        let mut link = self.link.lock();
        if matches!(*link, Link::Idle) && self.connect(&mut link).is_err() {
            return;
        }
        let Link::Connected(transport) = &mut *link else {
            return;
        };

        if let Err(e) = self.send(transport.as_mut(), &envelope) {
            tracing::warn!("gelf: send to {} failed: {}", self.addr, e);
            // A broken stream is replaced on the next write
            if self.addr.scheme == Scheme::Tcp && matches!(e, LogError::Send { .. }) {
                *link = Link::Idle;
            }
        }
    }
}
