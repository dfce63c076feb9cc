//! Stream event logging against a live in-process gRPC server

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use apilog_core::{AttrValue, LogRecord, MemorySink};
use apilog_transport::interceptors::stream::{ERROR, MESSAGE_SIZE, STREAM_OP};
use apilog_transport::{
    CallContext, CallOption, ClientStream, DebugClientStream, GrpcClientStream, GrpcStreamer,
    StreamDesc, StreamInterceptor,
};
use futures::{Stream, StreamExt};
use prost::Message;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_test::{assert_err, assert_ok};
use tonic::body::Body;
use tonic::codec::ProstCodec;
use tonic::codegen::{BoxFuture, Service};
use tonic::metadata::MetadataValue;
use tonic::server::{NamedService, StreamingService};
use tonic::transport::{Channel, Server};
use tonic::{Code, Request, Response, Status, Streaming};

const CHAT: &str = "/echo.Echo/Chat";

type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, Status>> + Send>>;

/// Upper-cases every message; a message reading "fail" ends the call with
/// `InvalidArgument`.
struct Chat;

impl StreamingService<String> for Chat {
    type Response = String;
    type ResponseStream = ReplyStream;
    type Future = BoxFuture<Response<ReplyStream>, Status>;

    fn call(&mut self, request: Request<Streaming<String>>) -> Self::Future {
        Box::pin(async move {
            let tag = request.metadata().get("x-request-tag").cloned();
            let replies = request.into_inner().map(|message| {
                let message = message?;
                if message == "fail" {
                    Err(Status::invalid_argument("refusing to echo"))
                } else {
                    Ok(message.to_uppercase())
                }
            });

            let mut response = Response::new(Box::pin(replies) as ReplyStream);
            response
                .metadata_mut()
                .insert("x-served-by", MetadataValue::from_static("echo"));
            if let Some(tag) = tag {
                response.metadata_mut().insert("x-echo-tag", tag);
            }
            Ok(response)
        })
    }
}

#[derive(Clone)]
struct EchoServer;

impl NamedService for EchoServer {
    const NAME: &'static str = "echo.Echo";
}

impl Service<http::Request<Body>> for EchoServer {
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Body>) -> Self::Future {
        match request.uri().path() {
            CHAT => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(ProstCodec::<String, String>::default());
                Ok(grpc.streaming(Chat, request).await)
            }),
            _ => Box::pin(async move {
                let mut response = http::Response::new(Body::default());
                let headers = response.headers_mut();
                headers.insert(
                    Status::GRPC_STATUS,
                    (Code::Unimplemented as i32).into(),
                );
                headers.insert(
                    http::header::CONTENT_TYPE,
                    tonic::metadata::GRPC_CONTENT_TYPE,
                );
                Ok(response)
            }),
        }
    }
}

async fn start_server() -> Channel {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        Server::builder()
            .add_service(EchoServer)
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );

    Channel::from_shared(format!("http://{}", addr))
        .unwrap()
        .connect()
        .await
        .unwrap()
}

async fn open_chat(
    interceptor: &StreamInterceptor,
    channel: &Channel,
    ctx: CallContext,
    method: &str,
) -> Result<DebugClientStream<GrpcClientStream<String, String>>, Status> {
    interceptor
        .intercept(
            ctx,
            &StreamDesc::bidi("Chat"),
            channel,
            method,
            &GrpcStreamer::<String, String>::new(),
            &[
                CallOption::WaitForReady(true),
                CallOption::MaxRecvMessageSize(1024 * 1024),
            ],
        )
        .await
}

fn ops(records: &[LogRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|r| r.get(STREAM_OP).and_then(AttrValue::as_str))
        .collect()
}

#[tokio::test]
async fn test_live_chat_records_every_operation() {
    let channel = start_server().await;
    let sink = MemorySink::new();
    let interceptor = StreamInterceptor::new(sink.clone());

    let mut ctx = CallContext::new();
    ctx.metadata
        .insert("x-request-tag", MetadataValue::from_static("run-42"));
    let mut stream = open_chat(&interceptor, &channel, ctx, CHAT).await.unwrap();

    let headers = assert_ok!(stream.header().await);
    assert_eq!(headers.get("x-served-by").unwrap().to_str().unwrap(), "echo");
    assert_eq!(headers.get("x-echo-tag").unwrap().to_str().unwrap(), "run-42");

    assert_ok!(stream.send_msg("hello".to_string()).await);
    assert_eq!(assert_ok!(stream.recv_msg().await), Some("HELLO".to_string()));
    assert_ok!(stream.send_msg("world".to_string()).await);
    assert_eq!(assert_ok!(stream.recv_msg().await), Some("WORLD".to_string()));
    assert_ok!(stream.close_send().await);
    assert_eq!(assert_ok!(stream.recv_msg().await), None);
    let _ = stream.trailer();

    let records = sink.records();
    assert_eq!(
        ops(&records),
        vec![
            "header",
            "send_msg",
            "recv_msg",
            "send_msg",
            "recv_msg",
            "close_send",
            "recv_msg",
            "trailer"
        ]
    );
    assert_eq!(
        records[2].get(MESSAGE_SIZE).and_then(AttrValue::as_int),
        Some("hello".to_string().encoded_len() as i64)
    );
    assert_eq!(
        records[3].get(MESSAGE_SIZE).and_then(AttrValue::as_int),
        Some("HELLO".to_string().encoded_len() as i64)
    );
    assert!(records.iter().all(|r| r.get(ERROR).is_none()));
}

#[tokio::test]
async fn test_live_server_error_passes_through() {
    let channel = start_server().await;
    let sink = MemorySink::new();
    let interceptor = StreamInterceptor::new(sink.clone());

    let mut stream = open_chat(&interceptor, &channel, CallContext::new(), CHAT)
        .await
        .unwrap();
    assert_ok!(stream.send_msg("fail".to_string()).await);

    let status = assert_err!(stream.recv_msg().await);
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "refusing to echo");

    let records = sink.records();
    let recv = records.last().unwrap();
    assert_eq!(recv.get(STREAM_OP).and_then(AttrValue::as_str), Some("recv_msg"));
    assert!(recv
        .get(ERROR)
        .and_then(AttrValue::as_str)
        .unwrap()
        .contains("refusing to echo"));
}

#[tokio::test]
async fn test_live_unknown_method_fails_open() {
    let channel = start_server().await;
    let sink = MemorySink::new();
    let interceptor = StreamInterceptor::new(sink.clone());

    let status = assert_err!(
        open_chat(&interceptor, &channel, CallContext::new(), "/echo.Echo/Missing").await
    );
    assert_eq!(status.code(), Code::Unimplemented);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].get(ERROR).is_some());
}

#[tokio::test]
async fn test_send_after_close_send_is_rejected() {
    let channel = start_server().await;
    let sink = MemorySink::new();
    let interceptor = StreamInterceptor::new(sink.clone());

    let mut stream = open_chat(&interceptor, &channel, CallContext::new(), CHAT)
        .await
        .unwrap();
    assert_ok!(stream.close_send().await);

    let status = assert_err!(stream.send_msg("late".to_string()).await);
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(ops(&sink.records()), vec!["close_send", "send_msg"]);
}
