//! Logging decorators for HTTP transports and RPC client streams.

pub mod round_trip;
pub mod stream;

pub use round_trip::{new_intercepting_transport, InterceptingTransport};
pub use stream::{DebugClientStream, StreamInterceptor};
