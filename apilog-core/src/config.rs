//! Interceptor configuration.
//!
//! [`InterceptorConfig`] is built once by the caller, wrapped in an `Arc` and
//! handed to a single interceptor, which never mutates it.
//!
//! # Examples
//!
//! ```rust
//! use apilog_core::config::InterceptorConfig;
//! use apilog_core::sink::MemorySink;
//!
//! let sink = MemorySink::new();
//! let config = InterceptorConfig::new(sink.clone())
//!     .capture_full_response(true)
//!     .request_filter(|dump| !dump.starts_with(b"OPTIONS"))
//!     .response_filter(|_dump, request_matched| request_matched);
//!
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{ApiLogResult, ConfigError};
use crate::settings::CaptureSettings;
use crate::sink::LogSink;

/// Scope list used when the configuration does not override it.
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Predicate over a request dump; `true` means log it.
pub type RequestFilter = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Predicate over a response dump and whether its request was logged.
pub type ResponseFilter = Arc<dyn Fn(&[u8], bool) -> bool + Send + Sync>;

/// Governs what an interceptor records and where.
#[derive(Clone, Default)]
pub struct InterceptorConfig {
    /// Override for the auth scopes of the underlying transport
    pub scopes: Option<Vec<String>>,
    /// Destination for captured traffic; required
    pub sink: Option<Arc<dyn LogSink>>,
    /// Include request bodies in dumps
    pub capture_full_request: bool,
    /// Include response bodies in dumps
    pub capture_full_response: bool,
    /// Filter on the request dump; absent means log every request
    pub request_filter: Option<RequestFilter>,
    /// Filter on the response dump; absent means log every response
    pub response_filter: Option<ResponseFilter>,
}

impl InterceptorConfig {
    /// Create a configuration writing to `sink`, capturing headers only.
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
            ..Self::default()
        }
    }

    /// Build a configuration from file-based settings plus a runtime sink.
    pub fn from_settings(settings: &CaptureSettings, sink: Arc<dyn LogSink>) -> ApiLogResult<Self> {
        settings.validate()?;

        let mut config = Self {
            scopes: settings.scopes.clone(),
            sink: Some(sink),
            capture_full_request: settings.capture_full_request,
            capture_full_response: settings.capture_full_response,
            request_filter: None,
            response_filter: None,
        };
        if let Some(pattern) = settings.request_regex()? {
            config.request_filter = Some(crate::filter::matching(pattern));
        }
        if let Some(pattern) = settings.response_regex()? {
            config.response_filter = Some(crate::filter::response_matching(pattern));
        }
        Ok(config)
    }

    /// Replace the sink with an already shared one.
    pub fn shared_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the auth scope list.
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Capture request bodies.
    pub fn capture_full_request(mut self, enabled: bool) -> Self {
        self.capture_full_request = enabled;
        self
    }

    /// Capture response bodies.
    pub fn capture_full_response(mut self, enabled: bool) -> Self {
        self.capture_full_response = enabled;
        self
    }

    /// Only log requests whose dump satisfies `filter`.
    pub fn request_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.request_filter = Some(Arc::new(filter));
        self
    }

    /// Only log responses whose dump satisfies `filter`. The second argument
    /// tells whether the matching request was logged.
    pub fn response_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&[u8], bool) -> bool + Send + Sync + 'static,
    {
        self.response_filter = Some(Arc::new(filter));
        self
    }

    /// Check the configuration can back an interceptor.
    pub fn validate(&self) -> ApiLogResult<()> {
        if self.sink.is_none() {
            return Err(ConfigError::MissingSink.into());
        }
        Ok(())
    }

    /// Evaluate the request filter.
    pub fn request_matches(&self, dump: &[u8]) -> bool {
        self.request_filter.as_ref().map_or(true, |f| f(dump))
    }

    /// Evaluate the response filter.
    pub fn response_matches(&self, dump: &[u8], request_matched: bool) -> bool {
        self.response_filter
            .as_ref()
            .map_or(true, |f| f(dump, request_matched))
    }
}

impl fmt::Debug for InterceptorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorConfig")
            .field("scopes", &self.scopes)
            .field("sink", &self.sink.as_ref().map(|_| "LogSink"))
            .field("capture_full_request", &self.capture_full_request)
            .field("capture_full_response", &self.capture_full_response)
            .field("request_filter", &self.request_filter.is_some())
            .field("response_filter", &self.response_filter.is_some())
            .finish()
    }
}

/// Scopes to request from the auth layer: the configuration's override when
/// present, `defaults` otherwise (including when there is no configuration).
pub fn resolve_scopes(config: Option<&InterceptorConfig>, defaults: &[&str]) -> Vec<String> {
    match config.and_then(|c| c.scopes.as_ref()) {
        Some(scopes) => scopes.clone(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiLogError;
    use crate::sink::MemorySink;
    use assert_matches::assert_matches;

    #[test]
    fn test_missing_sink_rejected() {
        let config = InterceptorConfig::default();
        assert_matches!(
            config.validate(),
            Err(ApiLogError::Config(ConfigError::MissingSink))
        );
        assert!(InterceptorConfig::new(MemorySink::new()).validate().is_ok());
    }

    #[test]
    fn test_filters_default_to_log_everything() {
        let config = InterceptorConfig::new(MemorySink::new());
        assert!(config.request_matches(b"GET / HTTP/1.1"));
        assert!(config.response_matches(b"HTTP/1.1 200 OK", false));
        assert!(!config.capture_full_request);
        assert!(!config.capture_full_response);
    }

    #[test]
    fn test_filters_receive_dump_and_match_state() {
        let config = InterceptorConfig::new(MemorySink::new())
            .request_filter(|dump| dump.starts_with(b"POST"))
            .response_filter(|_, request_matched| !request_matched);

        assert!(config.request_matches(b"POST /upload HTTP/1.1"));
        assert!(!config.request_matches(b"GET / HTTP/1.1"));
        assert!(config.response_matches(b"HTTP/1.1 200 OK", false));
        assert!(!config.response_matches(b"HTTP/1.1 200 OK", true));
    }

    #[test]
    fn test_resolve_scopes() {
        assert_eq!(
            resolve_scopes(None, DEFAULT_SCOPES),
            vec!["https://www.googleapis.com/auth/cloud-platform".to_string()]
        );

        let config = InterceptorConfig::new(MemorySink::new());
        assert_eq!(resolve_scopes(Some(&config), DEFAULT_SCOPES).len(), 1);

        let config = config.scopes(["https://www.googleapis.com/auth/bigquery.readonly"]);
        assert_eq!(
            resolve_scopes(Some(&config), DEFAULT_SCOPES),
            vec!["https://www.googleapis.com/auth/bigquery.readonly".to_string()]
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = CaptureSettings {
            scopes: None,
            capture_full_request: true,
            capture_full_response: false,
            request_pattern: Some("^GET ".to_string()),
            response_pattern: None,
        };
        let config = InterceptorConfig::from_settings(&settings, Arc::new(MemorySink::new())).unwrap();

        assert!(config.capture_full_request);
        assert!(config.request_matches(b"GET /v1 HTTP/1.1"));
        assert!(!config.request_matches(b"DELETE /v1 HTTP/1.1"));
        assert!(config.response_matches(b"anything", false));
    }

    #[test]
    fn test_shared_sink_across_configs() {
        let sink = MemorySink::new();
        let shared: Arc<dyn LogSink> = Arc::new(sink.clone());
        let http = InterceptorConfig::default().shared_sink(shared.clone());
        let rpc = InterceptorConfig::default()
            .capture_full_response(true)
            .shared_sink(shared);

        assert!(http.validate().is_ok());
        http.sink.as_ref().unwrap().append("from http");
        rpc.sink.as_ref().unwrap().append("from rpc");
        assert_eq!(sink.entries(), vec!["from http", "from rpc"]);
    }

    #[test]
    fn test_debug_does_not_require_sink_debug() {
        let rendered = format!("{:?}", InterceptorConfig::new(MemorySink::new()));
        assert!(rendered.contains("sink: Some(\"LogSink\")"));
    }
}
