//! Destinations for captured traffic.
//!
//! A sink is append-only and best-effort: nothing it does can fail the call
//! being observed. Sinks that write to real I/O report failures through
//! `tracing` and carry on.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::ApiLogResult;
use crate::record::{Level, LogRecord};

/// Append-only destination for formatted traffic logs.
pub trait LogSink: Send + Sync {
    /// Append a block of text.
    fn append(&self, text: &str);

    /// Write a structured record. Text sinks get the record's `key=value` form.
    fn emit(&self, record: &LogRecord) {
        self.append(&record.to_string());
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn append(&self, text: &str) {
        (**self).append(text)
    }

    fn emit(&self, record: &LogRecord) {
        (**self).emit(record)
    }
}

/// Sink writing line-oriented text to any [`Write`] implementation.
///
/// Each append is written in one `write_all` under a lock, so concurrent
/// callers interleave at block granularity. With timestamps enabled every
/// append is prefixed with local time in `YYYY/MM/DD HH:MM:SS` form.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    timestamps: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink over `writer` with timestamp prefixes.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            timestamps: true,
        }
    }

    /// Enable or disable timestamp prefixes.
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn line(&self, text: &str) -> String {
        let mut line = String::with_capacity(text.len() + 21);
        if self.timestamps {
            line.push_str(&chrono::Local::now().format("%Y/%m/%d %H:%M:%S ").to_string());
        }
        line.push_str(text);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}

impl WriterSink<File> {
    /// Open (or create) `path` for appending.
    pub fn file(path: impl AsRef<Path>) -> ApiLogResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        debug!("Writing captured traffic to {}", path.as_ref().display());
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn append(&self, text: &str) {
        let line = self.line(text);
        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            warn!("Failed to write captured traffic to sink: {}", e);
        }
    }
}

impl<W: Write + Send> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("timestamps", &self.timestamps)
            .finish_non_exhaustive()
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryBuffer>>,
}

#[derive(Debug, Default)]
struct MemoryBuffer {
    entries: Vec<String>,
    records: Vec<LogRecord>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every appended block, records included in their text form.
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    /// Structured records emitted so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner.lock().records.clone()
    }

    /// All entries joined with newlines.
    pub fn contents(&self) -> String {
        self.inner.lock().entries.join("\n")
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        let mut buffer = self.inner.lock();
        buffer.entries.clear();
        buffer.records.clear();
    }
}

impl LogSink for MemorySink {
    fn append(&self, text: &str) {
        self.inner.lock().entries.push(text.to_string());
    }

    fn emit(&self, record: &LogRecord) {
        let mut buffer = self.inner.lock();
        buffer.entries.push(record.to_string());
        buffer.records.push(record.clone());
    }
}

/// Sink forwarding to the global `tracing` dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append(&self, text: &str) {
        info!("{}", text);
    }

    fn emit(&self, record: &LogRecord) {
        let attrs = record.attrs_display();
        match record.level {
            Level::Debug => debug!(attrs = %attrs, "{}", record.message),
            Level::Info => info!(attrs = %attrs, "{}", record.message),
            Level::Warn => warn!(attrs = %attrs, "{}", record.message),
            Level::Error => error!(attrs = %attrs, "{}", record.message),
        }
    }
}
