//! Request/response capture around a unary HTTP transport.
//!
//! The interceptor wraps a "real" transport. Anything that transport does to
//! the request afterwards (auth headers, compression, redirects) is not part
//! of the logged dump, which shows the request as it was handed in.

use std::fmt;
use std::sync::Arc;

use apilog_core::{
    dump_request, dump_response, format_block, ApiLogResult, BlockKind, ConfigError,
    InterceptorConfig, LogSink,
};
use async_trait::async_trait;
use reqwest::{Request, Response};
use tracing::debug;

use crate::transport::HttpTransport;

/// Transport that dumps each request and response to a sink and otherwise
/// behaves exactly like the transport it wraps.
pub struct InterceptingTransport<T> {
    inner: T,
    config: Arc<InterceptorConfig>,
    sink: Arc<dyn LogSink>,
}

impl<T: HttpTransport> InterceptingTransport<T> {
    /// Wrap `inner`. Fails if no configuration is given or it has no sink.
    pub fn new(config: Option<Arc<InterceptorConfig>>, inner: T) -> ApiLogResult<Self> {
        let config = config.ok_or(ConfigError::MissingConfig)?;
        let sink = config.sink.clone().ok_or(ConfigError::MissingSink)?;
        Ok(Self {
            inner,
            config,
            sink,
        })
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The configuration in effect.
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for InterceptingTransport<T> {
    async fn execute(&self, request: Request) -> ApiLogResult<Response> {
        let request_dump = dump_request(&request, self.config.capture_full_request)?;
        let request_matched = self.config.request_matches(&request_dump);
        if request_matched {
            self.sink.append(&format_block(BlockKind::Request, &request_dump));
        }
        debug!(
            "{} {} dumped ({} bytes, logged: {})",
            request.method(),
            request.url(),
            request_dump.len(),
            request_matched
        );

        let response = self.inner.execute(request).await?;

        let (response_dump, response) =
            dump_response(response, self.config.capture_full_response).await?;
        if self.config.response_matches(&response_dump, request_matched) {
            self.sink.append(&format_block(BlockKind::Response, &response_dump));
        }

        Ok(response)
    }
}

impl<T: fmt::Debug> fmt::Debug for InterceptingTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptingTransport")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wrap `inner` in an [`InterceptingTransport`].
pub fn new_intercepting_transport<T: HttpTransport>(
    config: Option<Arc<InterceptorConfig>>,
    inner: T,
) -> ApiLogResult<InterceptingTransport<T>> {
    InterceptingTransport::new(config, inner)
}
