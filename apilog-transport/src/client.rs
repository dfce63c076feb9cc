//! Ready-to-use logging HTTP client.
//!
//! [`LoggingClient`] pairs a `reqwest::Client` (for building requests) with an
//! [`InterceptingTransport`] over an authorized transport, so an API client
//! can be pointed at it and every exchange lands in the configured sink.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use apilog_core::{InterceptorConfig, WriterSink};
//! use apilog_transport::LoggingClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = WriterSink::file("integration_log_bigquery.txt")?;
//!     let client = LoggingClient::new(Arc::new(InterceptorConfig::new(sink))).await?;
//!
//!     let response = client
//!         .get("https://bigquery.googleapis.com/bigquery/v2/projects/bigquery-public-data/datasets")
//!         .await?;
//!     println!("status: {}", response.status());
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use apilog_core::{
    resolve_scopes, ApiLogResult, ConfigError, InterceptorConfig, TransportError, DEFAULT_SCOPES,
};
use reqwest::{IntoUrl, Method, Request, RequestBuilder, Response};
use tracing::info;

use crate::interceptors::InterceptingTransport;
use crate::transport::{HttpTransport, TransportAuthorizer, Unauthenticated};

/// Build an intercepting transport over whatever `authorizer` produces for
/// the resolved scopes.
///
/// The configuration is checked before the authorizer is consulted, so a bad
/// configuration never triggers credential lookups.
pub async fn new_intercepted_transport<A>(
    config: Option<Arc<InterceptorConfig>>,
    authorizer: &A,
) -> ApiLogResult<InterceptingTransport<Arc<dyn HttpTransport>>>
where
    A: TransportAuthorizer + ?Sized,
{
    match config.as_deref() {
        None => return Err(ConfigError::MissingConfig.into()),
        Some(c) => c.validate()?,
    }

    let scopes = resolve_scopes(config.as_deref(), DEFAULT_SCOPES);
    let inner = authorizer.authorize(&scopes, reqwest::Client::new()).await?;
    info!("Intercepting HTTP transport ready ({} scope(s))", scopes.len());

    InterceptingTransport::new(config, inner)
}

/// HTTP client whose every exchange goes through an [`InterceptingTransport`].
pub struct LoggingClient {
    builder: reqwest::Client,
    transport: InterceptingTransport<Arc<dyn HttpTransport>>,
}

impl LoggingClient {
    /// Client without credentials.
    pub async fn new(config: Arc<InterceptorConfig>) -> ApiLogResult<Self> {
        Self::with_authorizer(config, &Unauthenticated).await
    }

    /// Client whose inner transport comes from `authorizer`.
    pub async fn with_authorizer<A>(config: Arc<InterceptorConfig>, authorizer: &A) -> ApiLogResult<Self>
    where
        A: TransportAuthorizer + ?Sized,
    {
        let transport = new_intercepted_transport(Some(config), authorizer).await?;
        Ok(Self {
            builder: reqwest::Client::new(),
            transport,
        })
    }

    /// Start building a request; send it with [`LoggingClient::send`].
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.builder.request(method, url)
    }

    /// Build and send a request.
    pub async fn send(&self, request: RequestBuilder) -> ApiLogResult<Response> {
        let request = request.build().map_err(TransportError::Http)?;
        self.execute(request).await
    }

    /// GET `url`.
    pub async fn get(&self, url: impl IntoUrl) -> ApiLogResult<Response> {
        self.send(self.request(Method::GET, url)).await
    }

    /// Send an already built request.
    pub async fn execute(&self, request: Request) -> ApiLogResult<Response> {
        self.transport.execute(request).await
    }

    /// The underlying intercepting transport.
    pub fn transport(&self) -> &InterceptingTransport<Arc<dyn HttpTransport>> {
        &self.transport
    }
}

impl fmt::Debug for LoggingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingClient")
            .field("config", self.transport.config())
            .finish_non_exhaustive()
    }
}
