//! File channel with optional size-based rotation
//!
//! Records are appended to one file (default `<exe name>.log` in the working
//! directory), one per line. When rotation is enabled and the file reaches `max_bytes`, it
//! is renamed to `path.1`, older files shift up to `path.N` and the oldest
//! is deleted.
//!
//! An open failure is remembered: the channel stays `NotReady` until the
//! next explicit `open()`.

use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Channel, ChannelBase, ChannelOptions};
use crate::constants::MIN_ROTATE_BYTES;
use crate::error::{LogError, Result};
use crate::format::default_text_formatter;
use crate::level::Level;
use crate::record::RecordRef;

enum FileState {
    Closed,
    Open { writer: BufWriter<File>, size: u64 },
    Failed,
}

pub struct FileChannel {
    base: ChannelBase,
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    state: Mutex<FileState>,
}

impl FileChannel {
    pub fn new(options: ChannelOptions) -> Result<Self> {
        let formatter = options.resolve_formatter(default_text_formatter)?;
        let path = options.path.clone().unwrap_or_else(default_path);
        let max_bytes = match options.max_bytes {
            0 => 0,
            n => n.max(MIN_ROTATE_BYTES),
        };
        Ok(Self {
            base: ChannelBase::new(options.level, formatter),
            path,
            max_bytes,
            max_files: options.max_files.max(1),
            state: Mutex::new(FileState::Closed),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_state(&self, state: &mut FileState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let (file, size) = open_append(&self.path).map_err(|e| self.io_err(e))?;
        *state = FileState::Open {
            writer: BufWriter::new(file),
            size,
        };
        Ok(())
    }

    fn io_err(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn rotate(&self, state: &mut FileState) -> io::Result<()> {
        if let FileState::Open { writer, .. } = state {
            writer.flush()?;
        }
        *state = FileState::Closed;
        rotate_files(&self.path, self.max_files)?;
        let file = open_truncate(&self.path)?;
        *state = FileState::Open {
            writer: BufWriter::new(file),
            size: 0,
        };
        Ok(())
    }
}

impl Channel for FileChannel {
    fn name(&self) -> &str {
        "file"
    }

    fn level(&self) -> Level {
        self.base.level()
    }

    fn set_level(&self, level: Level) {
        self.base.set_level(level)
    }

    fn open(&self) -> Result<()> {
        let mut state = self.state.lock();
        if matches!(*state, FileState::Open { .. }) {
            return Ok(());
        }
        match self.open_state(&mut state) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("{}", e);
                *state = FileState::Failed;
                Err(e)
            }
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let result = match &mut *state {
            FileState::Open { writer, .. } => writer.flush().map_err(|e| self.io_err(e)),
            _ => Ok(()),
        };
        *state = FileState::Closed;
        result
    }

    fn write(&self, record: &RecordRef) {
        let mut state = self.state.lock();
        match *state {
            FileState::Failed => return,
            FileState::Closed => {
                if let Err(e) = self.open_state(&mut state) {
                    tracing::warn!("{}", e);
                    *state = FileState::Failed;
                    return;
                }
            }
            FileState::Open { .. } => {}
        }

        let Some(text) = self.base.format(record) else {
            return;
        };
        let FileState::Open { writer, size } = &mut *state else {
            return;
        };
        let newline = text.last() != Some(&b'\n');
        let written = writer
            .write_all(&text)
            .and_then(|_| if newline { writer.write_all(b"\n") } else { Ok(()) })
            .and_then(|_| writer.flush());
        if let Err(e) = written {
            tracing::warn!("write {} failed: {}", self.path.display(), e);
            return;
        }
        *size = size.saturating_add(text.len() as u64 + u64::from(newline));

        if self.max_bytes > 0 && *size >= self.max_bytes {
            if let Err(e) = self.rotate(&mut state) {
                tracing::warn!("rotate {} failed: {}", self.path.display(), e);
                *state = FileState::Failed;
            }
        }
    }
}

impl FileChannel {
    /// Whether the last open attempt failed
    pub fn is_failed(&self) -> bool {
        matches!(*self.state.lock(), FileState::Failed)
    }

    /// Fail with `NotReady` unless the file is open
    pub fn ready(&self) -> Result<()> {
        match *self.state.lock() {
            FileState::Open { .. } => Ok(()),
            _ => Err(LogError::NotReady { channel: "file" }),
        }
    }
}

fn default_path() -> PathBuf {
    let name = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "logrelay".to_string());
    PathBuf::from(format!("{}.log", name))
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

fn open_truncate(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn rotate_files(path: &Path, max_files: usize) -> io::Result<()> {
    if max_files == 0 {
        return Ok(());
    }

    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "logrelay.log".to_string());
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    // Drop the oldest
    let _ = fs::remove_file(dir.join(format!("{}.{}", name, max_files)));

    // N-1 -> N, ... 1 -> 2
    for i in (1..max_files).rev() {
        let src = dir.join(format!("{}.{}", name, i));
        if src.exists() {
            let _ = fs::rename(&src, dir.join(format!("{}.{}", name, i + 1)));
        }
    }

    if path.exists() {
        fs::rename(path, dir.join(format!("{}.1", name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordPool;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        base.join(format!("logrelay-file-{}-{}-{}", tag, pid, ts))
    }

    fn record(pool: &std::sync::Arc<RecordPool>, text: &str) -> RecordRef {
        let mut b = pool.acquire();
        b.set_text(text);
        b.freeze()
    }

    #[test]
    fn test_rotate_files_keeps_max_files() {
        let dir = unique_temp_dir("rotate");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("app.log");

        fs::write(&path, "active").unwrap();
        fs::write(dir.join("app.log.1"), "one").unwrap();
        fs::write(dir.join("app.log.2"), "two").unwrap();

        rotate_files(&path, 2).unwrap();

        assert_eq!(fs::read_to_string(dir.join("app.log.1")).unwrap(), "active");
        assert_eq!(fs::read_to_string(dir.join("app.log.2")).unwrap(), "one");
        assert!(!dir.join("app.log.3").exists());
        assert!(!path.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_writes_lines_and_creates_parent() {
        let dir = unique_temp_dir("write");
        let path = dir.join("nested").join("app.log");
        let channel =
            FileChannel::new(ChannelOptions::new().with_path(&path).with_layout("%m%n")).unwrap();
        channel.open().unwrap();
        channel.ready().unwrap();

        let pool = RecordPool::new(4);
        channel.write(&record(&pool, "first"));
        channel.write(&record(&pool, "second"));
        channel.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_lines_are_terminated() {
        let dir = unique_temp_dir("newline");
        let path = dir.join("app.log");
        let channel = FileChannel::new(ChannelOptions::new().with_path(&path).with_layout("%m"))
            .unwrap();
        let pool = RecordPool::new(2);
        channel.write(&record(&pool, "a"));
        channel.write(&record(&pool, "b"));
        channel.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rotation_on_size() {
        let dir = unique_temp_dir("size");
        let path = dir.join("app.log");
        let channel = FileChannel::new(
            ChannelOptions::new()
                .with_path(&path)
                .with_layout("%m%n")
                .with_rotation(1, 3),
        )
        .unwrap();
        assert_eq!(channel.max_bytes, MIN_ROTATE_BYTES);

        let pool = RecordPool::new(4);
        let line = "x".repeat(600);
        channel.write(&record(&pool, &line));
        channel.write(&record(&pool, &line));
        channel.write(&record(&pool, "tail"));
        channel.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "tail\n");
        assert_eq!(
            fs::read_to_string(dir.join("app.log.1")).unwrap().len(),
            2 * 601
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_failure_is_remembered() {
        let dir = unique_temp_dir("fail");
        fs::create_dir_all(&dir).unwrap();
        // A directory cannot be opened for appending
        let channel = FileChannel::new(ChannelOptions::new().with_path(&dir)).unwrap();
        assert!(channel.open().is_err());
        assert!(channel.is_failed());
        assert!(matches!(
            channel.ready(),
            Err(LogError::NotReady { channel: "file" })
        ));

        let pool = RecordPool::new(1);
        channel.write(&record(&pool, "dropped"));
        assert!(channel.is_failed());
        let _ = fs::remove_dir_all(&dir);
    }
}
