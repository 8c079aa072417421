//! Library-wide constants
//!
//! Centralized defaults to avoid duplication and ensure consistency.

// =============================================================================
// Async dispatch
// =============================================================================

/// Default maximum queued records before the async path starts dropping
pub const DEFAULT_MAX_QUEUED: usize = 10_000;

/// Name of the background dispatch thread
pub const DISPATCH_THREAD_NAME: &str = "logrelay-dispatch";

// =============================================================================
// Pools
// =============================================================================

/// Maximum idle records kept for reuse
pub const RECORD_POOL_CAPACITY: usize = 1024;

/// Maximum idle buffers kept for reuse
pub const BUFFER_POOL_CAPACITY: usize = 256;

/// Initial buffer allocation
pub const SMALL_BUFFER_SIZE: usize = 64;

/// Buffers that grew beyond this are not returned to the pool
pub const MAX_POOLED_BUFFER_SIZE: usize = 64 * 1024;

// =============================================================================
// Wire transport (GELF)
// =============================================================================

/// GELF protocol version written into every envelope
pub const GELF_VERSION: &str = "1.1";

/// Default maximum UDP datagram size (header included)
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1420;

/// Size of the chunk header: magic(2) + id(8) + seq(1) + count(1)
pub const CHUNK_HEADER_LEN: usize = 12;

/// Maximum number of chunks a single message may be split into
pub const MAX_CHUNKS: usize = 128;

/// Magic bytes prefixing every chunk
pub const MAGIC_CHUNKED: [u8; 2] = [0x1e, 0x1f];

/// First byte of a zlib stream
pub const MAGIC_ZLIB: [u8; 1] = [0x78];

/// First bytes of a gzip stream
pub const MAGIC_GZIP: [u8; 2] = [0x1f, 0x8b];

/// Record delimiter for GELF over TCP
pub const TCP_DELIMITER: u8 = 0x00;

/// Default compression level when none is configured (fastest)
pub const DEFAULT_COMPRESS_LEVEL: u32 = 1;

// =============================================================================
// HTTP bulk sink
// =============================================================================

/// Client-level timeout for HTTP bulk requests (seconds)
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Default number of records per bulk request
pub const DEFAULT_BULK_SIZE: usize = 100;

// =============================================================================
// File sink
// =============================================================================

/// Smallest rotation threshold accepted (bytes)
pub const MIN_ROTATE_BYTES: u64 = 1024;

/// Default number of rotated files kept
pub const DEFAULT_MAX_FILES: usize = 5;

// =============================================================================
// Formatting
// =============================================================================

/// Default text layout
pub const DEFAULT_TEXT_LAYOUT: &str = "%-5p %d{yyyy-MM-dd HH:mm:ss} %F:%L %x{*}%w - %m%n";

/// Default JSON layout
pub const DEFAULT_JSON_LAYOUT: &str = "time=%d level=%p file=%F line=%L msg=%m";

/// Largest min/max width accepted in a layout action
pub const MAX_LAYOUT_WIDTH: usize = 4096;
