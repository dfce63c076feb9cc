//! Structured log records and the guard that flushes them.
//!
//! A [`LogRecord`] is built up while one intercepted operation runs and is
//! written to a sink exactly once. [`RecordGuard`] owns the record for the
//! duration of the operation and emits it when dropped, so the record reaches
//! the sink on every exit path: normal return, `?`, or a cancelled future.

use std::fmt;
use std::sync::Arc;

use crate::sink::LogSink;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Verbose diagnostics
    Debug,
    /// Normal traffic events
    Info,
    /// Something unexpected that did not stop the operation
    Warn,
    /// The operation failed
    Error,
}

impl Level {
    /// Upper-case name used in text output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a record attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Text value
    Str(String),
    /// Signed integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
}

impl AttrValue {
    /// The value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) if needs_quoting(s) => write!(f, "{:?}", s),
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '=' || c == '"' || c.is_control())
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One structured log entry: level, message and ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity
    pub level: Level,
    /// Human readable message
    pub message: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, AttrValue)>,
}

impl LogRecord {
    /// Create a record with no attributes.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            attrs: Vec::new(),
        }
    }

    /// Append an attribute, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append an attribute.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.push((key.into(), value.into()));
    }

    /// First attribute with the given key.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Attributes rendered as `key=value` pairs separated by spaces.
    pub fn attrs_display(&self) -> String {
        self.attrs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={} msg={}",
            self.level,
            AttrValue::Str(self.message.clone())
        )?;
        for (key, value) in &self.attrs {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Owns a [`LogRecord`] and emits it to the sink when dropped.
pub struct RecordGuard {
    sink: Arc<dyn LogSink>,
    record: LogRecord,
}

impl RecordGuard {
    /// Start a record that will be flushed to `sink`.
    pub fn new(sink: Arc<dyn LogSink>, record: LogRecord) -> Self {
        Self { sink, record }
    }

    /// Add an attribute to the pending record.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.record.push(key, value);
    }

    /// The pending record.
    pub fn record(&self) -> &LogRecord {
        &self.record
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.sink.emit(&self.record);
    }
}

impl fmt::Debug for RecordGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordGuard")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
