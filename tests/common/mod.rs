//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Status, Streaming};

use ext_proc::grpc::{ExtProcService, GrpcServer};
use ext_proc::lifecycle::Shutdown;
use ext_proc::net::{Listener, StreamTracker};
use ext_proc::processing::{
    ImmediateResponse, MutationBuilder, Processor, ProcessorChain, ProcessorError, ProcessorResult,
    StreamError, StreamHandler, TransactionContext,
};
use ext_proc::proto::{
    processing_request::Request, HeaderMap, HeaderValue, HttpBody, HttpHeaders, HttpTrailers,
    ProcessingRequest, ProcessingResponse, PROCESS_PATH,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

/// Wire header map; values go in `raw_value` the way the proxy sends them.
pub fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
    HeaderMap {
        headers: pairs
            .iter()
            .map(|(k, v)| HeaderValue {
                key: k.to_string(),
                value: String::new(),
                raw_value: v.as_bytes().to_vec(),
            })
            .collect(),
    }
}

fn message(request: Request) -> ProcessingRequest {
    ProcessingRequest {
        request: Some(request),
        ..Default::default()
    }
}

pub fn request_headers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    message(Request::RequestHeaders(HttpHeaders {
        headers: Some(header_map(pairs)),
        end_of_stream: false,
        ..Default::default()
    }))
}

pub fn response_headers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    message(Request::ResponseHeaders(HttpHeaders {
        headers: Some(header_map(pairs)),
        end_of_stream: false,
        ..Default::default()
    }))
}

pub fn request_body(body: &[u8], end_of_stream: bool) -> ProcessingRequest {
    message(Request::RequestBody(HttpBody {
        body: body.to_vec(),
        end_of_stream,
    }))
}

pub fn response_body(body: &[u8], end_of_stream: bool) -> ProcessingRequest {
    message(Request::ResponseBody(HttpBody {
        body: body.to_vec(),
        end_of_stream,
    }))
}

pub fn request_trailers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    message(Request::RequestTrailers(HttpTrailers {
        trailers: Some(header_map(pairs)),
    }))
}

pub fn response_trailers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    message(Request::ResponseTrailers(HttpTrailers {
        trailers: Some(header_map(pairs)),
    }))
}

/// Text of the `raw_value` of every header set by a reply, in order.
pub fn set_header_values(reply: &ProcessingResponse, key: &str) -> Vec<String> {
    use ext_proc::proto::processing_response::Response;

    let common = match reply.response.as_ref() {
        Some(Response::RequestHeaders(h)) | Some(Response::ResponseHeaders(h)) => h.response.as_ref(),
        _ => None,
    };
    common
        .and_then(|c| c.header_mutation.as_ref())
        .map(|m| {
            m.set_headers
                .iter()
                .filter_map(|o| o.header.as_ref())
                .filter(|h| h.key.eq_ignore_ascii_case(key))
                .map(|h| String::from_utf8_lossy(&h.raw_value).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Test processors
// ---------------------------------------------------------------------------

/// Sets one header on request headers.
pub struct SetRequestHeader {
    pub key: &'static str,
    pub value: &'static str,
}

#[async_trait]
impl Processor for SetRequestHeader {
    fn name(&self) -> &str {
        "set_request_header"
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        mutation.set_header(self.key, self.value);
        Ok(None)
    }
}

/// Copies the value of `read` (as written earlier in the chain) into `write`.
pub struct CopyMutationHeader {
    pub read: &'static str,
    pub write: &'static str,
}

#[async_trait]
impl Processor for CopyMutationHeader {
    fn name(&self) -> &str {
        "copy_mutation_header"
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        if let Some(value) = mutation.get_header(self.read) {
            mutation.set_header(self.write, &value);
        }
        Ok(None)
    }
}

/// Answers every request directly with the given status.
pub struct Deny(pub StatusCode);

#[async_trait]
impl Processor for Deny {
    fn name(&self) -> &str {
        "deny"
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        Ok(Some(
            ImmediateResponse::new(self.0)
                .header("content-type", "text/plain")
                .body("denied")
                .details("denied by test"),
        ))
    }
}

/// Counts invocations per header phase.
#[derive(Clone, Default)]
pub struct Counter {
    pub request: Arc<Mutex<usize>>,
    pub response: Arc<Mutex<usize>>,
}

impl Counter {
    pub fn request_calls(&self) -> usize {
        *self.request.lock().unwrap()
    }

    pub fn response_calls(&self) -> usize {
        *self.response.lock().unwrap()
    }
}

#[async_trait]
impl Processor for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        *self.request.lock().unwrap() += 1;
        Ok(None)
    }

    async fn response_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        *self.response.lock().unwrap() += 1;
        Ok(None)
    }
}

/// Records what the context looked like when response headers arrived.
#[derive(Clone, Default)]
pub struct Observer {
    pub seen: Arc<Mutex<Vec<Observed>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub tag: Option<String>,
}

#[async_trait]
impl Processor for Observer {
    fn name(&self) -> &str {
        "observer"
    }

    async fn request_headers(
        &self,
        ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        // Stash a per-stream value to check it never leaks across streams.
        let tag = ctx.request_header("x-tag").unwrap_or_default().to_string();
        ctx.metadata_mut().insert("tag", tag);
        Ok(None)
    }

    async fn response_headers(
        &self,
        ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        let observed = Observed {
            request_id: ctx.request_id().to_string(),
            method: ctx.method().to_string(),
            path: ctx.url().map(|u| u.path().to_string()).unwrap_or_default(),
            status: ctx.status(),
            tag: ctx
                .metadata()
                .get("tag")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        self.seen.lock().unwrap().push(observed);
        Ok(None)
    }
}

/// Fails on response headers.
pub struct Failing;

#[async_trait]
impl Processor for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn response_headers(
        &self,
        _ctx: &mut TransactionContext,
        _mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        Err(ProcessorError::Failed("upstream policy unavailable".into()))
    }
}

/// Sleeps on request headers, to keep a phase in flight.
pub struct Slow(pub Duration);

#[async_trait]
impl Processor for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    async fn request_headers(
        &self,
        _ctx: &mut TransactionContext,
        mutation: &mut MutationBuilder,
    ) -> ProcessorResult {
        tokio::time::sleep(self.0).await;
        mutation.set_header("x-slow", "done");
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// In-process stream harness
// ---------------------------------------------------------------------------

/// Drives a [`StreamHandler`] over in-memory channels.
pub struct StreamHarness {
    inbound: Option<mpsc::Sender<Result<ProcessingRequest, Status>>>,
    outbound: mpsc::Receiver<Result<ProcessingResponse, Status>>,
    handle: JoinHandle<Result<(), StreamError>>,
}

impl StreamHarness {
    pub fn start(chain: ProcessorChain, shutdown: &Shutdown) -> Self {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        let handler = StreamHandler::new(
            ReceiverStream::new(in_rx),
            out_tx,
            Arc::new(chain),
            shutdown.subscribe(),
        );
        Self {
            inbound: Some(in_tx),
            outbound: out_rx,
            handle: tokio::spawn(handler.run()),
        }
    }

    pub async fn send(&self, message: ProcessingRequest) {
        self.send_raw(Ok(message)).await;
    }

    pub async fn send_raw(&self, message: Result<ProcessingRequest, Status>) {
        self.inbound
            .as_ref()
            .expect("inbound already closed")
            .send(message)
            .await
            .expect("handler stopped reading");
    }

    /// Next reply, or `None` once the handler has dropped its sender.
    pub async fn recv(&mut self) -> Option<ProcessingResponse> {
        tokio::time::timeout(TIMEOUT, self.outbound.recv())
            .await
            .expect("timed out waiting for reply")
            .map(|r| r.expect("handler sent an error status"))
    }

    /// Send one message and wait for its reply.
    pub async fn exchange(&mut self, message: ProcessingRequest) -> ProcessingResponse {
        self.send(message).await;
        self.recv().await.expect("stream closed without a reply")
    }

    /// `true` if no reply is pending right now.
    pub fn no_pending_reply(&mut self) -> bool {
        self.outbound.try_recv().is_err()
    }

    /// Close the inbound side (proxy half-close) and collect the result.
    pub async fn finish(mut self) -> Result<(), StreamError> {
        self.inbound.take();
        self.join().await
    }

    pub async fn join(self) -> Result<(), StreamError> {
        tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .expect("handler did not finish")
            .expect("handler panicked")
    }
}

// ---------------------------------------------------------------------------
// Real gRPC transport
// ---------------------------------------------------------------------------

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: StreamTracker,
    pub handle: JoinHandle<()>,
}

/// Start a gRPC server on an ephemeral port.
pub async fn start_grpc_server(chain: ProcessorChain) -> TestServer {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr();
    let shutdown = Shutdown::new();
    let tracker = StreamTracker::new();

    let service = ExtProcService::new(Arc::new(chain), shutdown.clone(), tracker.clone());
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        GrpcServer::new(service)
            .run(listener, signal)
            .await
            .unwrap();
    });

    TestServer {
        addr,
        shutdown,
        tracker,
        handle,
    }
}

/// Client side of one `Process` stream.
pub struct GrpcStream {
    pub tx: mpsc::Sender<ProcessingRequest>,
    pub rx: Streaming<ProcessingResponse>,
}

impl GrpcStream {
    pub async fn open(addr: SocketAddr) -> Result<Self, Status> {
        let channel: Channel = Endpoint::from_shared(format!("http://{addr}"))
            .unwrap()
            .connect()
            .await
            .unwrap();
        let mut client = tonic::client::Grpc::new(channel);
        client
            .ready()
            .await
            .map_err(|e| Status::unknown(e.to_string()))?;

        let (tx, rx) = mpsc::channel(16);
        let response = client
            .streaming(
                tonic::Request::new(ReceiverStream::new(rx)),
                PathAndQuery::from_static(PROCESS_PATH),
                ProstCodec::<ProcessingRequest, ProcessingResponse>::default(),
            )
            .await?;
        Ok(Self {
            tx,
            rx: response.into_inner(),
        })
    }

    pub async fn send(&self, message: ProcessingRequest) {
        self.tx.send(message).await.unwrap();
    }

    /// Next reply; `Ok(None)` when the server closed the stream cleanly.
    pub async fn recv(&mut self) -> Result<Option<ProcessingResponse>, Status> {
        tokio::time::timeout(TIMEOUT, self.rx.message())
            .await
            .expect("timed out waiting for reply")
    }

    pub async fn exchange(&mut self, message: ProcessingRequest) -> ProcessingResponse {
        self.tx.send(message).await.unwrap();
        self.recv()
            .await
            .expect("stream failed")
            .expect("stream closed without a reply")
    }
}
