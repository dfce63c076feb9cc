//! Client streams over a live tonic channel.
//!
//! [`GrpcStreamer`] opens a streaming call on a `tonic::transport::Channel`
//! and hands back a [`GrpcClientStream`], so a [`StreamInterceptor`] can sit
//! in front of real gRPC traffic:
//!
//! ```rust,no_run
//! use apilog_core::MemorySink;
//! use apilog_transport::{CallContext, ClientStream, GrpcStreamer, StreamDesc, StreamInterceptor};
//! use tonic::transport::Channel;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = Channel::from_static("http://127.0.0.1:50051").connect().await?;
//! let interceptor = StreamInterceptor::new(MemorySink::new());
//! let mut stream = interceptor
//!     .intercept(
//!         CallContext::new(),
//!         &StreamDesc::bidi("Chat"),
//!         &channel,
//!         "/echo.Echo/Chat",
//!         &GrpcStreamer::<String, String>::new(),
//!         &[],
//!     )
//!     .await?;
//! stream.send_msg("hello".to_string()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`StreamInterceptor`]: crate::interceptors::StreamInterceptor

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use prost::Message;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::codec::{CompressionEncoding, ProstCodec};
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::{Status, Streaming};
use tracing::debug;

use crate::rpc::{CallContext, CallOption, ClientStream, StreamDesc, Streamer};

/// Outbound messages buffered before `send_msg` waits on the transport.
pub const DEFAULT_SEND_BUFFER: usize = 16;

/// Opens `Req`/`Resp` streaming calls on a tonic [`Channel`].
pub struct GrpcStreamer<Req, Resp> {
    send_buffer: usize,
    _messages: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> GrpcStreamer<Req, Resp> {
    /// Streamer with the default send buffer.
    pub fn new() -> Self {
        Self::with_send_buffer(DEFAULT_SEND_BUFFER)
    }

    /// Streamer buffering up to `send_buffer` outbound messages (at least one).
    pub fn with_send_buffer(send_buffer: usize) -> Self {
        Self {
            send_buffer: send_buffer.max(1),
            _messages: PhantomData,
        }
    }
}

impl<Req, Resp> Default for GrpcStreamer<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> fmt::Debug for GrpcStreamer<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcStreamer")
            .field("send_buffer", &self.send_buffer)
            .finish()
    }
}

fn apply_options(
    mut grpc: Grpc<Channel>,
    options: &[CallOption],
) -> Result<Grpc<Channel>, Status> {
    for option in options {
        grpc = match option {
            CallOption::MaxRecvMessageSize(limit) => grpc.max_decoding_message_size(*limit),
            CallOption::MaxSendMessageSize(limit) => grpc.max_encoding_message_size(*limit),
            CallOption::Compressor(name) if name == "gzip" => grpc
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip),
            CallOption::Compressor(name) => {
                return Err(Status::invalid_argument(format!(
                    "unsupported compressor: {}",
                    name
                )))
            }
            // The channel is always awaited until ready before the call starts
            CallOption::WaitForReady(_) => grpc,
        };
    }
    Ok(grpc)
}

#[async_trait]
impl<Req, Resp> Streamer<Channel> for GrpcStreamer<Req, Resp>
where
    Req: Message + Send + Sync + 'static,
    Resp: Message + Default + Send + Sync + 'static,
{
    type Stream = GrpcClientStream<Req, Resp>;

    async fn open(
        &self,
        ctx: CallContext,
        desc: &StreamDesc,
        conn: &Channel,
        method: &str,
        options: &[CallOption],
    ) -> Result<Self::Stream, Status> {
        let path = PathAndQuery::try_from(method)
            .map_err(|e| Status::invalid_argument(format!("invalid method path {}: {}", method, e)))?;

        let mut grpc = apply_options(Grpc::new(conn.clone()), options)?;
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("Service was not ready: {}", e)))?;

        let (sender, receiver) = mpsc::channel(self.send_buffer);
        let mut request = tonic::Request::new(ReceiverStream::new(receiver));
        *request.metadata_mut() = ctx.metadata.clone();
        if let Some(timeout) = ctx.timeout {
            request.set_timeout(timeout);
        }

        debug!("Opening {} stream {}", desc.stream_name, method);
        let response = grpc
            .streaming(request, path, ProstCodec::<Req, Resp>::default())
            .await?;
        let (headers, inbound, _extensions) = response.into_parts();

        Ok(GrpcClientStream {
            ctx,
            headers,
            trailers: MetadataMap::new(),
            outbound: Some(sender),
            inbound,
        })
    }
}

/// One open streaming call on a tonic channel.
pub struct GrpcClientStream<Req, Resp> {
    ctx: CallContext,
    headers: MetadataMap,
    trailers: MetadataMap,
    outbound: Option<mpsc::Sender<Req>>,
    inbound: Streaming<Resp>,
}

#[async_trait]
impl<Req, Resp> ClientStream for GrpcClientStream<Req, Resp>
where
    Req: Message + Send + 'static,
    Resp: Message + Send + 'static,
{
    type Request = Req;
    type Response = Resp;

    async fn header(&mut self) -> Result<MetadataMap, Status> {
        Ok(self.headers.clone())
    }

    fn trailer(&self) -> MetadataMap {
        self.trailers.clone()
    }

    async fn close_send(&mut self) -> Result<(), Status> {
        self.outbound = None;
        Ok(())
    }

    fn context(&self) -> &CallContext {
        &self.ctx
    }

    async fn send_msg(&mut self, message: Req) -> Result<(), Status> {
        let sender = self
            .outbound
            .as_ref()
            .ok_or_else(|| Status::failed_precondition("send_msg called after close_send"))?;
        sender
            .send(message)
            .await
            .map_err(|_| Status::unavailable("request stream already finished"))
    }

    async fn recv_msg(&mut self) -> Result<Option<Resp>, Status> {
        match self.inbound.message().await? {
            Some(message) => Ok(Some(message)),
            None => {
                if let Some(trailers) = self.inbound.trailers().await? {
                    self.trailers = trailers;
                }
                Ok(None)
            }
        }
    }
}

impl<Req, Resp> fmt::Debug for GrpcClientStream<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcClientStream")
            .field("ctx", &self.ctx)
            .field("send_closed", &self.outbound.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_buffer_is_never_zero() {
        assert_eq!(GrpcStreamer::<String, String>::with_send_buffer(0).send_buffer, 1);
        assert_eq!(
            GrpcStreamer::<String, String>::default().send_buffer,
            DEFAULT_SEND_BUFFER
        );
    }

    #[tokio::test]
    async fn test_unknown_compressor_rejected() {
        let channel = Channel::from_static("http://127.0.0.1:1").connect_lazy();
        let result = apply_options(
            Grpc::new(channel),
            &[CallOption::Compressor("snappy".to_string())],
        );
        match result {
            Err(status) => {
                assert_eq!(status.code(), tonic::Code::InvalidArgument);
                assert!(status.message().contains("snappy"));
            }
            Ok(_) => panic!("snappy should be rejected"),
        }
    }
}
