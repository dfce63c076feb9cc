//! Event logging for client RPC streams.
//!
//! [`StreamInterceptor::intercept`] opens the real stream and returns a
//! [`DebugClientStream`] that emits one record per operation. Every record of
//! a stream carries the same `debug_id`, so a single stream's history can be
//! pulled out of an interleaved log.
//!
//! ```rust,ignore
//! let interceptor = StreamInterceptor::default(); // records go to `tracing`
//! let mut stream = interceptor
//!     .intercept(ctx, &desc, &channel, "/pkg.Service/Watch", &streamer, &[])
//!     .await?;
//! stream.send_msg(request).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use apilog_core::{
    ApiLogResult, ConfigError, InterceptorConfig, Level, LogRecord, LogSink, RecordGuard,
    TracingSink,
};
use async_trait::async_trait;
use prost::Message;
use tonic::metadata::MetadataMap;
use tonic::Status;
use uuid::Uuid;

use crate::rpc::{CallContext, CallOption, ClientStream, StreamDesc, Streamer};

/// Attribute carrying the stream's correlation id.
pub const DEBUG_ID: &str = "debug_id";
/// Attribute carrying the RPC method name.
pub const METHOD: &str = "method";
/// Attribute naming the stream operation.
pub const STREAM_OP: &str = "stream_op";
/// Attribute carrying the error of a failed operation.
pub const ERROR: &str = "error";
/// Attribute carrying the encoded size of a sent or received message.
pub const MESSAGE_SIZE: &str = "message_size";

const OPEN_MESSAGE: &str = "intercepting client stream";
const EVENT_MESSAGE: &str = "client stream event";

fn new_debug_id() -> String {
    format!("debug_stream_{}", Uuid::new_v4().simple())
}

/// Opens streams through a caller-supplied [`Streamer`] and wraps them.
#[derive(Clone)]
pub struct StreamInterceptor {
    sink: Arc<dyn LogSink>,
}

impl StreamInterceptor {
    /// Interceptor writing records to `sink`.
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Interceptor using the sink of an existing configuration.
    pub fn from_config(config: &InterceptorConfig) -> ApiLogResult<Self> {
        let sink = config.sink.clone().ok_or(ConfigError::MissingSink)?;
        Ok(Self { sink })
    }

    /// Open a stream and wrap it.
    ///
    /// The opening record is flushed once `streamer` returns. If opening
    /// fails the error is recorded and returned as is.
    pub async fn intercept<C, S>(
        &self,
        ctx: CallContext,
        desc: &StreamDesc,
        conn: &C,
        method: &str,
        streamer: &S,
        options: &[CallOption],
    ) -> Result<DebugClientStream<S::Stream>, Status>
    where
        C: ?Sized + Sync,
        S: Streamer<C> + ?Sized,
    {
        let id = new_debug_id();
        let mut log = RecordGuard::new(
            self.sink.clone(),
            LogRecord::new(Level::Info, OPEN_MESSAGE)
                .with(DEBUG_ID, &id)
                .with(METHOD, method),
        );

        match streamer.open(ctx, desc, conn, method, options).await {
            Ok(real) => Ok(DebugClientStream {
                real,
                id,
                method: method.to_string(),
                sink: self.sink.clone(),
            }),
            Err(status) => {
                log.push(ERROR, status.to_string());
                Err(status)
            }
        }
    }
}

impl Default for StreamInterceptor {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl fmt::Debug for StreamInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamInterceptor").finish_non_exhaustive()
    }
}

/// A client stream that records every operation on the stream it wraps.
pub struct DebugClientStream<S> {
    real: S,
    id: String,
    method: String,
    sink: Arc<dyn LogSink>,
}

impl<S> DebugClientStream<S> {
    /// Correlation id shared by all records of this stream.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// RPC method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Unwrap the real stream; no further operations are recorded.
    pub fn into_inner(self) -> S {
        self.real
    }

    fn event(&self, op: &'static str) -> RecordGuard {
        RecordGuard::new(
            self.sink.clone(),
            LogRecord::new(Level::Info, EVENT_MESSAGE)
                .with(DEBUG_ID, &self.id)
                .with(METHOD, &self.method)
                .with(STREAM_OP, op),
        )
    }
}

fn record_status<T>(log: &mut RecordGuard, result: &Result<T, Status>) {
    if let Err(status) = result {
        log.push(ERROR, status.to_string());
    }
}

#[async_trait]
impl<S: ClientStream> ClientStream for DebugClientStream<S> {
    type Request = S::Request;
    type Response = S::Response;

    async fn header(&mut self) -> Result<MetadataMap, Status> {
        let mut log = self.event("header");
        let result = self.real.header().await;
        record_status(&mut log, &result);
        result
    }

    fn trailer(&self) -> MetadataMap {
        let _log = self.event("trailer");
        self.real.trailer()
    }

    async fn close_send(&mut self) -> Result<(), Status> {
        let mut log = self.event("close_send");
        let result = self.real.close_send().await;
        record_status(&mut log, &result);
        result
    }

    fn context(&self) -> &CallContext {
        let _log = self.event("context");
        self.real.context()
    }

    async fn send_msg(&mut self, message: Self::Request) -> Result<(), Status> {
        let mut log = self.event("send_msg");
        log.push(MESSAGE_SIZE, message.encoded_len());
        let result = self.real.send_msg(message).await;
        record_status(&mut log, &result);
        result
    }

    async fn recv_msg(&mut self) -> Result<Option<Self::Response>, Status> {
        let mut log = self.event("recv_msg");
        let result = self.real.recv_msg().await;
        match &result {
            Ok(Some(message)) => log.push(MESSAGE_SIZE, message.encoded_len()),
            Ok(None) => log.push("end_of_stream", true),
            Err(status) => log.push(ERROR, status.to_string()),
        }
        result
    }
}

impl<S: fmt::Debug> fmt::Debug for DebugClientStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugClientStream")
            .field("real", &self.real)
            .field("id", &self.id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
