//! # apilog core
//!
//! Shared building blocks for recording API traffic while debugging: the
//! interceptor configuration, log sinks, structured log records, and the
//! wire-format dumps of HTTP requests and responses.
//!
//! The decorators that actually sit on a transport or an RPC stream live in
//! `apilog-transport`; this crate has no opinion about how traffic is sent.
//!
//! ## Architecture
//!
//! - [`error`]: error taxonomy shared by every interceptor
//! - [`config`]: [`InterceptorConfig`] and scope resolution
//! - [`settings`]: file-loadable [`CaptureSettings`]
//! - [`sink`]: [`LogSink`] and the writer, memory and tracing sinks
//! - [`record`]: [`LogRecord`] and the flush-on-drop [`RecordGuard`]
//! - [`dump`]: request/response dumps and block formatting
//! - [`filter`]: ready-made filters

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod dump;
pub mod error;
pub mod filter;
pub mod record;
pub mod settings;
pub mod sink;

// Re-export commonly used types for convenience
pub use config::{
    resolve_scopes, InterceptorConfig, RequestFilter, ResponseFilter, DEFAULT_SCOPES,
};
pub use dump::{dump_request, dump_response, format_block, BlockKind};
pub use error::{ApiLogError, ApiLogResult, ConfigError, DumpError, TransportError};
pub use record::{AttrValue, Level, LogRecord, RecordGuard};
pub use settings::CaptureSettings;
pub use sink::{LogSink, MemorySink, TracingSink, WriterSink};

/// Current version of the apilog-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
