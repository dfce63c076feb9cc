//! Client-side RPC stream capabilities.
//!
//! These traits describe a streaming call the way a generated client sees it:
//! something that opens a stream ([`Streamer`]) and the stream it hands back
//! ([`ClientStream`]). Errors are `tonic::Status` and header/trailer metadata
//! is a `tonic::metadata::MetadataMap`.

use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tonic::metadata::MetadataMap;
use tonic::Status;

/// Per-call context travelling with a stream.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Outgoing request metadata
    pub metadata: MetadataMap,
    /// Deadline for the whole call, if any
    pub timeout: Option<Duration>,
}

impl CallContext {
    /// Empty context without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Static description of a streaming method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDesc {
    /// Method name within its service
    pub stream_name: String,
    /// Client sends a stream of messages
    pub client_streams: bool,
    /// Server sends a stream of messages
    pub server_streams: bool,
}

impl StreamDesc {
    /// Descriptor for a bidirectional streaming method.
    pub fn bidi(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: true,
            server_streams: true,
        }
    }
}

/// Options handed unchanged to the stream opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOption {
    /// Block until the channel is ready instead of failing fast
    WaitForReady(bool),
    /// Largest message the client accepts
    MaxRecvMessageSize(usize),
    /// Largest message the client sends
    MaxSendMessageSize(usize),
    /// Compression codec name
    Compressor(String),
}

/// An open client stream.
#[async_trait]
pub trait ClientStream: Send {
    /// Message type sent by the client
    type Request: Message + Send + 'static;
    /// Message type received from the server
    type Response: Message + Send + 'static;

    /// Wait for and return the server's header metadata.
    async fn header(&mut self) -> Result<MetadataMap, Status>;

    /// Trailer metadata; empty until the stream has finished.
    fn trailer(&self) -> MetadataMap;

    /// Half-close the client side.
    async fn close_send(&mut self) -> Result<(), Status>;

    /// The context the stream was opened with.
    fn context(&self) -> &CallContext;

    /// Send one message.
    async fn send_msg(&mut self, message: Self::Request) -> Result<(), Status>;

    /// Receive one message; `None` once the server has finished.
    async fn recv_msg(&mut self) -> Result<Option<Self::Response>, Status>;
}

/// Opens streams over a connection of type `C`.
#[async_trait]
pub trait Streamer<C: ?Sized + Sync>: Send + Sync {
    /// The stream produced
    type Stream: ClientStream;

    /// Open a stream for `method`.
    async fn open(
        &self,
        ctx: CallContext,
        desc: &StreamDesc,
        conn: &C,
        method: &str,
        options: &[CallOption],
    ) -> Result<Self::Stream, Status>;
}
