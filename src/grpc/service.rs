//! `ExternalProcessor` implementation backed by the protocol engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

use crate::lifecycle::Shutdown;
use crate::net::StreamTracker;
use crate::observability::{metrics, tracing::stream_span};
use crate::processing::{ProcessorChain, StreamHandler};
use crate::proto::{ExternalProcessor, ProcessingRequest, ProcessingResponse};

/// Spawns one [`StreamHandler`] task per `Process` call.
#[derive(Debug, Clone)]
pub struct ExtProcService {
    chain: Arc<ProcessorChain>,
    shutdown: Shutdown,
    tracker: StreamTracker,
    response_buffer: usize,
}

impl ExtProcService {
    pub fn new(chain: Arc<ProcessorChain>, shutdown: Shutdown, tracker: StreamTracker) -> Self {
        Self {
            chain,
            shutdown,
            tracker,
            response_buffer: 8,
        }
    }

    /// Replies buffered per stream before the handler waits on the transport.
    pub fn response_buffer(mut self, size: usize) -> Self {
        self.response_buffer = size.max(1);
        self
    }

    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }
}

#[async_trait::async_trait]
impl ExternalProcessor for ExtProcService {
    type ProcessStream = ReceiverStream<Result<ProcessingResponse, Status>>;

    async fn process(
        &self,
        request: Request<Streaming<ProcessingRequest>>,
    ) -> Result<Response<Self::ProcessStream>, Status> {
        if self.shutdown.is_triggered() {
            return Err(Status::unavailable("server is shutting down"));
        }

        let guard = self.tracker.track();
        let span = stream_span(guard.id());
        let remote = request.remote_addr();
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(self.response_buffer);

        let handler = StreamHandler::new(
            inbound,
            tx.clone(),
            Arc::clone(&self.chain),
            self.shutdown.subscribe(),
        );

        tokio::spawn(
            async move {
                tracing::debug!(remote = ?remote, "Stream opened");
                if let Err(err) = handler.run().await {
                    tracing::warn!(error = %err, kind = err.kind(), "Stream terminated");
                    metrics::record_stream_error(err.kind());
                    // The proxy may already be gone; nothing left to report to.
                    let _ = tx.send(Err(err.into())).await;
                }
                drop(guard);
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
