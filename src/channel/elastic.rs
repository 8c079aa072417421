//! HTTP bulk indexer channel (Elasticsearch-compatible)
//!
//! - single record: `POST <url>/<index>/_doc` with the formatted JSON
//! - batch: `POST <url>/_bulk` as NDJSON, split into requests of `batch`
//!   records
//!
//! The index is `<prefix>_<yyyyMMdd>` for the current local day. Each
//! request is retried `retry` extra times and then dropped.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::Local;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use super::{BatchChannel, Channel, ChannelBase, ChannelOptions};
use crate::constants::{DEFAULT_BULK_SIZE, HTTP_TIMEOUT_SECS};
use crate::error::{LogError, Result};
use crate::format::default_json_formatter;
use crate::level::Level;
use crate::record::RecordRef;

const DEFAULT_INDEX_PREFIX: &str = "log";

pub struct ElasticChannel {
    base: ChannelBase,
    url: String,
    index: String,
    retry: usize,
    batch: usize,
    client: Mutex<Option<Client>>,
}

impl ElasticChannel {
    pub fn new(options: ChannelOptions) -> Result<Self> {
        let formatter = options.resolve_formatter(default_json_formatter)?;
        let url = options.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(LogError::ConfigValidation {
                field: "url",
                reason: format!("expected an http(s) URL, got {:?}", options.url),
            });
        }
        let index = if options.index.is_empty() {
            DEFAULT_INDEX_PREFIX.to_string()
        } else {
            options.index.clone()
        };
        Ok(Self {
            base: ChannelBase::new(options.level, formatter),
            url,
            index,
            retry: options.retry,
            batch: if options.batch == 0 {
                DEFAULT_BULK_SIZE
            } else {
                options.batch
            },
            client: Mutex::new(None),
        })
    }

    /// Index for records written today
    pub fn index_name(&self) -> String {
        format!("{}_{}", self.index, Local::now().format("%Y%m%d"))
    }

    /// Shared client, built on first use
    fn client(&self) -> Result<Client> {
        let mut client = self.client.lock();
        if let Some(c) = client.as_ref() {
            return Ok(c.clone());
        }
        let c = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| LogError::Http {
                source: Box::new(e),
            })?;
        *client = Some(c.clone());
        Ok(c)
    }

    fn post(&self, url: &str, content_type: &'static str, body: Bytes) {
        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("elastic: {}", e);
                return;
            }
        };

        let mut last_err = None;
        for _ in 0..=self.retry {
            let result = client
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .body(body.clone())
                .send()
                .and_then(|resp| resp.error_for_status());
            match result {
                Ok(_) => return,
                Err(e) => last_err = Some(e),
            }
        }
        if let Some(e) = last_err {
            tracing::warn!(
                "elastic: dropping record after {} attempts: {}",
                self.retry + 1,
                e
            );
        }
    }

    /// NDJSON body: an action line before every document
    fn bulk_body(&self, index: &str, records: &[&RecordRef]) -> Bytes {
        let mut body = BytesMut::new();
        for record in records {
            let Some(doc) = self.base.format(record) else {
                continue;
            };
            body.put_slice(b"{\"index\":{\"_index\":");
            body.put_slice(serde_json::to_string(index).unwrap_or_default().as_bytes());
            body.put_slice(b"}}\n");
            body.put_slice(trim_newline(&doc));
            body.put_u8(b'\n');
        }
        body.freeze()
    }
}

fn trim_newline(doc: &[u8]) -> &[u8] {
    doc.strip_suffix(b"\n").unwrap_or(doc)
}

impl Channel for ElasticChannel {
    fn name(&self) -> &str {
        "elastic"
    }

    fn level(&self) -> Level {
        self.base.level()
    }

    fn set_level(&self, level: Level) {
        self.base.set_level(level)
    }

    fn open(&self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn close(&self) -> Result<()> {
        // Dropping the last client handle closes its idle connections
        self.client.lock().take();
        Ok(())
    }

    fn write(&self, record: &RecordRef) {
        let Some(doc) = self.base.format(record) else {
            return;
        };
        let url = format!("{}/{}/_doc", self.url, self.index_name());
        self.post(&url, "application/json", doc);
    }

    fn as_batch(&self) -> Option<&dyn BatchChannel> {
        Some(self)
    }
}

impl BatchChannel for ElasticChannel {
    fn write_batch(&self, records: &[&RecordRef]) {
        let url = format!("{}/_bulk", self.url);
        let index = self.index_name();
        for chunk in records.chunks(self.batch) {
            let body = self.bulk_body(&index, chunk);
            if !body.is_empty() {
                self.post(&url, "application/x-ndjson", body);
            }
        }
    }
}
