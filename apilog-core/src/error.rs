//! Error types for API traffic capture.
//!
//! Only two kinds of failure originate here: configuration problems caught when
//! an interceptor is built, and dump failures for a single call. Everything a
//! wrapped transport reports travels as [`TransportError`] and is handed back
//! to the caller exactly as the transport produced it.
//!
//! # Examples
//!
//! ```rust
//! use apilog_core::error::{ApiLogError, ConfigError};
//!
//! let error = ApiLogError::from(ConfigError::MissingSink);
//! assert_eq!(error.category(), "config");
//! println!("Error: {}", error);
//! ```

use thiserror::Error;

/// The main error type for all capture operations.
#[derive(Error, Debug)]
pub enum ApiLogError {
    /// The interceptor could not be built from the supplied configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request or response could not be dumped for logging
    #[error("Serialization error: {0}")]
    Serialization(#[from] DumpError),

    /// Failure reported by a wrapped transport, passed through untouched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// IO errors (opening log files and the like)
    #[error("IO error: {source}")]
    Io {
        #[from]
        /// The underlying IO error
        source: std::io::Error,
    },
}

/// Configuration-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConfigError {
    /// No configuration was supplied at all
    #[error("An interceptor configuration must be supplied")]
    MissingConfig,

    /// The configuration has nowhere to write captured traffic
    #[error("Interceptor configuration must contain a sink")]
    MissingSink,

    /// Settings file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Settings file has invalid format
    #[error("Invalid configuration format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// Configuration parameter has invalid value
    #[error("Invalid value for parameter '{parameter}': {value} - {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Failures producing the textual dump of a request or response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DumpError {
    /// Full body capture was requested but the body is a stream
    #[error("Cannot capture streaming {direction} body")]
    StreamingBody { direction: &'static str },

    /// The body could not be read while buffering it
    #[error("Failed to read {direction} body: {reason}")]
    BodyRead {
        direction: &'static str,
        reason: String,
    },

    /// The buffered response could not be reassembled for the caller
    #[error("Failed to rebuild response: {reason}")]
    Rebuild { reason: String },
}

/// Errors raised by transports doing the real network exchange.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum TransportError {
    /// Error from the reqwest client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-specific failure described by the transport itself
    #[error("{transport_type} transport failed: {reason}")]
    Failed {
        transport_type: String,
        reason: String,
    },

    /// Any other error type a custom transport wants to surface
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type alias for Results using ApiLogError.
pub type ApiLogResult<T> = Result<T, ApiLogError>;

impl ApiLogError {
    /// Get the error category for this error.
    pub fn category(&self) -> &'static str {
        match self {
            ApiLogError::Config(_) => "config",
            ApiLogError::Serialization(_) => "serialization",
            ApiLogError::Transport(_) => "transport",
            ApiLogError::Io { .. } => "io",
        }
    }

    /// True when the error was produced by the wrapped transport rather than
    /// by the capture layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiLogError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiLogError {
    fn from(err: reqwest::Error) -> Self {
        ApiLogError::Transport(TransportError::Http(err))
    }
}
