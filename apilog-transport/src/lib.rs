//! # apilog transport
//!
//! Decorators that record API traffic without changing it:
//!
//! - [`InterceptingTransport`] wraps any [`HttpTransport`] and writes a
//!   `REQUEST` and a `RESPONSE` block per exchange to the configured sink,
//!   subject to the configuration's filters.
//! - [`StreamInterceptor`] opens RPC client streams through a [`Streamer`] and
//!   hands back a [`DebugClientStream`] that writes one structured record per
//!   stream operation, all tagged with the stream's correlation id.
//! - [`GrpcStreamer`] opens those streams on a real tonic channel.
//!
//! Errors from the wrapped transport or stream are returned unchanged; the
//! only errors added here come from configuration and dumping.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use apilog_core::{InterceptorConfig, MemorySink};
//! use apilog_transport::{HttpTransport, InterceptingTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = MemorySink::new();
//!     let config = Arc::new(InterceptorConfig::new(sink.clone()).capture_full_response(true));
//!     let transport = InterceptingTransport::new(Some(config), reqwest::Client::new())?;
//!
//!     let request = reqwest::Client::new().get("https://example.com/").build()?;
//!     transport.execute(request).await?;
//!     println!("{}", sink.contents());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod client;
pub mod grpc;
pub mod interceptors;
pub mod rpc;
pub mod transport;

pub use client::{new_intercepted_transport, LoggingClient};
pub use grpc::{GrpcClientStream, GrpcStreamer};
pub use interceptors::{
    new_intercepting_transport, DebugClientStream, InterceptingTransport, StreamInterceptor,
};
pub use rpc::{CallContext, CallOption, ClientStream, StreamDesc, Streamer};
pub use transport::{HttpTransport, TransportAuthorizer, Unauthenticated};
