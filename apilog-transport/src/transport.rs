//! The unary HTTP transport capability and the auth collaborator.
//!
//! [`HttpTransport`] is the one thing an interceptor needs from whatever
//! performs the real exchange. It is implemented for `reqwest::Client`, for
//! shared and boxed transports, and by the interceptor itself, so decorators
//! stack in any order.

use std::sync::Arc;

use apilog_core::{ApiLogResult, TransportError};
use async_trait::async_trait;
use reqwest::{Request, Response};
use tracing::debug;

/// Sends one request and returns its response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the exchange.
    async fn execute(&self, request: Request) -> ApiLogResult<Response>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn execute(&self, request: Request) -> ApiLogResult<Response> {
        reqwest::Client::execute(self, request)
            .await
            .map_err(|e| TransportError::Http(e).into())
    }
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(&self, request: Request) -> ApiLogResult<Response> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    async fn execute(&self, request: Request) -> ApiLogResult<Response> {
        (**self).execute(request).await
    }
}

/// Builds the transport that sits under the interceptor, typically one that
/// attaches credentials for `scopes`. Credential handling lives entirely in
/// the implementation.
#[async_trait]
pub trait TransportAuthorizer: Send + Sync {
    /// Wrap `base` in whatever the given scopes require.
    async fn authorize(
        &self,
        scopes: &[String],
        base: reqwest::Client,
    ) -> ApiLogResult<Arc<dyn HttpTransport>>;
}

/// Authorizer that attaches nothing and sends through the base client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unauthenticated;

#[async_trait]
impl TransportAuthorizer for Unauthenticated {
    async fn authorize(
        &self,
        scopes: &[String],
        base: reqwest::Client,
    ) -> ApiLogResult<Arc<dyn HttpTransport>> {
        debug!("Ignoring {} scope(s) for unauthenticated transport", scopes.len());
        Ok(Arc::new(base))
    }
}
