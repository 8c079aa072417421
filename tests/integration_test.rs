//! Integration tests for the logging pipeline
//!
//! Exercises the public API end to end: loggers in both modes, the async
//! engine's drop policy, and GELF delivery over real localhost sockets.

use logrelay::channel::GelfFormatter;
use logrelay::transport::{ChunkHeader, CompressType};
use logrelay::{
    AsyncChannel, Channel, ChannelOptions, FileChannel, GelfChannel, JsonFormatter, Level,
    Logger, RecordPool, RecordRef,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Read;
use std::net::{TcpListener, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Recording channel
// =============================================================================

/// Channel keeping every record text it receives
struct MemoryChannel {
    level: Level,
    seen: Mutex<Vec<String>>,
}

impl MemoryChannel {
    fn new(level: Level) -> Arc<Self> {
        Arc::new(Self {
            level,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn texts(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Channel for MemoryChannel {
    fn name(&self) -> &str {
        "memory"
    }

    fn level(&self) -> Level {
        self.level
    }

    fn set_level(&self, _level: Level) {}

    fn write(&self, record: &RecordRef) {
        self.seen.lock().push(record.text().to_string());
    }
}

/// Channel that sleeps in every write, so the queue backs up
struct SlowChannel {
    delay: Duration,
    seen: Mutex<Vec<String>>,
}

impl Channel for SlowChannel {
    fn name(&self) -> &str {
        "slow"
    }

    fn level(&self) -> Level {
        Level::Trace
    }

    fn set_level(&self, _level: Level) {}

    fn write(&self, record: &RecordRef) {
        std::thread::sleep(self.delay);
        self.seen.lock().push(record.text().to_string());
    }
}

fn unique_temp_dir(tag: &str) -> std::path::PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("logrelay-it-{}-{}-{}", tag, std::process::id(), ts))
}

// =============================================================================
// Async dispatch
// =============================================================================

#[test]
fn test_async_logger_preserves_per_producer_order() {
    let sink = MemoryChannel::new(Level::Trace);
    let logger = Arc::new(
        Logger::builder()
            .shared_channel(sink.clone())
            .asynchronous(true)
            .max_queued(100_000)
            .pool(RecordPool::new(64))
            .build()
            .unwrap(),
    );

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for i in 0..250 {
                    logger.info(&format!("{}:{}", p, i));
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    logger.stop().unwrap();

    let texts = sink.texts();
    assert_eq!(texts.len(), 1000);
    let mut per_producer: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for text in &texts {
        let (p, i) = text.split_once(':').unwrap();
        per_producer
            .entry(p.parse().unwrap())
            .or_default()
            .push(i.parse().unwrap());
    }
    for seq in per_producer.values() {
        assert_eq!(*seq, (0..250).collect::<Vec<u32>>());
    }
    assert_eq!(logger.pool().stats().in_flight(), 0);
}

#[test]
fn test_async_overflow_is_counted() {
    let pool = RecordPool::new(16);
    let slow = Arc::new(SlowChannel {
        delay: Duration::from_millis(20),
        seen: Mutex::new(Vec::new()),
    });
    let engine = AsyncChannel::new(vec![slow.clone() as Arc<dyn Channel>], 4);
    engine.open().unwrap();

    for i in 0..40 {
        let mut b = pool.acquire();
        b.set_text(&i.to_string());
        engine.write(&b.freeze());
    }
    engine.close().unwrap();

    let stats = engine.stats();
    let delivered = slow.seen.lock().len() as u64;
    assert_eq!(stats.accepted() + stats.dropped(), 40);
    assert_eq!(stats.delivered(), stats.accepted());
    assert_eq!(delivered, stats.accepted());
    assert!(stats.dropped() > 0);
    assert_eq!(engine.queued(), 0);
    assert_eq!(pool.stats().in_flight(), 0);

    // Delivered records are still in submission order
    let seen: Vec<u32> = slow.seen.lock().iter().map(|t| t.parse().unwrap()).collect();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_sync_and_async_fan_out_to_level_filtered_sinks() {
    for asynchronous in [false, true] {
        let all = MemoryChannel::new(Level::Trace);
        let errors = MemoryChannel::new(Level::Error);
        let logger = Logger::builder()
            .shared_channel(all.clone())
            .shared_channel(errors.clone())
            .asynchronous(asynchronous)
            .pool(RecordPool::new(8))
            .build()
            .unwrap();

        logger.debug("d");
        logger.error("e");
        logger.fatal("f");
        logger.stop().unwrap();

        assert_eq!(all.texts(), vec!["d", "e", "f"]);
        assert_eq!(errors.texts(), vec!["e", "f"]);
    }
}

// =============================================================================
// GELF over UDP / TCP
// =============================================================================

fn udp_collector() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let url = format!("udp://{}", socket.local_addr().unwrap());
    (socket, url)
}

#[test]
fn test_gelf_udp_chunks_reassemble() {
    let (collector, url) = udp_collector();
    let channel = GelfChannel::new(
        ChannelOptions::new()
            .with_url(url)
            .with_host("it-host")
            .with_max_datagram_size(200),
    )
    .unwrap();
    channel.open().unwrap();

    let pool = RecordPool::new(2);
    let text = "x".repeat(1500);
    let mut b = pool.acquire();
    b.set_level(Level::Error).set_text(&text);
    channel.write(&b.freeze());

    let mut parts: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    let mut id = None;
    let mut total = 0;
    let mut buf = [0u8; 256];
    loop {
        let n = collector.recv(&mut buf).unwrap();
        assert!(n <= 200);
        let (header, payload) = ChunkHeader::parse(&buf[..n]).unwrap();
        assert_eq!(*id.get_or_insert(header.message_id()), header.message_id());
        total = header.total();
        parts.insert(header.seq(), payload.to_vec());
        if parts.len() == total as usize {
            break;
        }
    }
    assert!(total > 1);
    assert_eq!(parts.keys().copied().collect::<Vec<_>>(), (0..total).collect::<Vec<_>>());

    let message: Vec<u8> = parts.into_values().flatten().collect();
    let v: serde_json::Value = serde_json::from_slice(&message).unwrap();
    assert_eq!(v["short_message"], text.as_str());
    assert_eq!(v["host"], "it-host");
    assert_eq!(v["level"], 3);
    channel.close().unwrap();
}

#[test]
fn test_gelf_udp_zlib_single_datagram() {
    let (collector, url) = udp_collector();
    let channel = GelfChannel::new(
        ChannelOptions::new()
            .with_url(url)
            .with_host("it-host")
            .with_compress(CompressType::Zlib, 6),
    )
    .unwrap();

    let pool = RecordPool::new(2);
    let mut b = pool.acquire();
    b.set_text("compressed hello");
    channel.write(&b.freeze());

    let mut buf = [0u8; 2048];
    let n = collector.recv(&mut buf).unwrap();
    assert_eq!(buf[0], 0x78);
    let mut json = String::new();
    flate2::read::ZlibDecoder::new(&buf[..n])
        .read_to_string(&mut json)
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["short_message"], "compressed hello");
    assert_eq!(v["version"], "1.1");
}

#[test]
fn test_gelf_tcp_null_delimited() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("tcp://{}", listener.local_addr().unwrap());
    let reader = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        while data.iter().filter(|&&b| b == 0).count() < 2 {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        data
    });

    let channel = GelfChannel::new(
        ChannelOptions::new()
            .with_url(url)
            .with_formatter(Arc::new(GelfFormatter::new("tcp-host"))),
    )
    .unwrap();
    let pool = RecordPool::new(2);
    for text in ["one", "two"] {
        let mut b = pool.acquire();
        b.set_text(text);
        channel.write(&b.freeze());
    }
    assert!(channel.is_connected());

    let data = reader.join().unwrap();
    let frames: Vec<&[u8]> = data.split(|&b| b == 0).filter(|f| !f.is_empty()).collect();
    assert_eq!(frames.len(), 2);
    for (frame, text) in frames.iter().zip(["one", "two"]) {
        let v: serde_json::Value = serde_json::from_slice(frame).unwrap();
        assert_eq!(v["short_message"], text);
        assert_eq!(v["host"], "tcp-host");
    }
    channel.close().unwrap();
}

// =============================================================================
// File sink through a logger
// =============================================================================

#[test]
fn test_file_channel_json_lines() {
    let dir = unique_temp_dir("json");
    let path = dir.join("app.log");
    let file = FileChannel::new(
        ChannelOptions::new()
            .with_path(&path)
            .with_formatter(Arc::new(JsonFormatter::new("level=%p msg=%m").unwrap())),
    )
    .unwrap();
    let logger = Logger::builder()
        .channel(file)
        .tag("env", "it")
        .asynchronous(true)
        .pool(RecordPool::new(8))
        .build()
        .unwrap();

    logger.warn("disk low");
    logger
        .with([logrelay::Field::new("free_mb", 12u64)])
        .error("disk full");
    logger.stop().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["level"], "WARN");
    assert_eq!(lines[0]["msg"], "disk low");
    assert_eq!(lines[0]["env"], "it");
    assert_eq!(lines[1]["free_mb"], 12);
    let _ = std::fs::remove_dir_all(&dir);
}

// =============================================================================
// Reference counting
// =============================================================================

proptest! {
    #[test]
    fn prop_refcount_balances(ops in proptest::collection::vec((0usize..4, any::<bool>()), 0..200)) {
        let pool = RecordPool::new(8);
        let mut handles: Vec<Vec<RecordRef>> = (0..4)
            .map(|i| {
                let mut b = pool.acquire();
                b.set_text(&i.to_string());
                vec![b.freeze()]
            })
            .collect();

        for (idx, retain) in ops {
            let refs = &mut handles[idx];
            if retain {
                if let Some(first) = refs.first() {
                    let extra = first.retain();
                    refs.push(extra);
                }
            } else if let Some(r) = refs.pop() {
                r.release();
            }

            // A record still referenced is never recycled or rewritten
            for (i, refs) in handles.iter().enumerate() {
                if let Some(r) = refs.first() {
                    prop_assert_eq!(r.ref_count(), refs.len());
                    prop_assert_eq!(r.text(), i.to_string());
                }
            }
            let live = handles.iter().filter(|h| !h.is_empty()).count() as u64;
            prop_assert_eq!(pool.stats().in_flight(), live);
        }

        drop(handles);
        let stats = pool.stats();
        prop_assert_eq!(stats.in_flight(), 0);
        prop_assert_eq!(stats.released, stats.acquired + stats.retained);
    }
}
