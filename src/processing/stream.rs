//! Per-stream protocol engine.
//!
//! # Responsibilities
//! - Receive phase messages one at a time and answer each with exactly one
//!   reply before reading the next
//! - Feed every message into the stream's [`TransactionContext`]
//! - Run the processor chain on header phases, acknowledge the others
//! - Validate every reply before it leaves the process
//!
//! # Design Decisions
//! - Shutdown is only observed while waiting for the next message; a phase
//!   that has started always runs to completion
//! - End of stream, a `Cancelled` status and shutdown all end the stream
//!   cleanly; everything else is a [`StreamError`]

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tonic::{Code, Status};

use super::context::TransactionContext;
use super::error::StreamError;
use super::mutation::MutationBuilder;
use super::phase::Phase;
use super::processor::{ChainOutcome, ProcessorChain};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::proto::{
    processing_response::Response, BodyResponse, HeadersResponse, ProcessingRequest,
    ProcessingResponse, TrailersResponse, Validate,
};

/// Sending half of a stream's replies, as consumed by the transport.
pub type ReplySender = mpsc::Sender<Result<ProcessingResponse, Status>>;

/// Drives one bidirectional `Process` stream.
pub struct StreamHandler<S> {
    inbound: S,
    outbound: ReplySender,
    chain: Arc<ProcessorChain>,
    shutdown: ShutdownSignal,
    ctx: TransactionContext,
}

impl<S> StreamHandler<S>
where
    S: Stream<Item = Result<ProcessingRequest, Status>> + Unpin + Send,
{
    pub fn new(
        inbound: S,
        outbound: ReplySender,
        chain: Arc<ProcessorChain>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            inbound,
            outbound,
            chain,
            shutdown,
            ctx: TransactionContext::new(),
        }
    }

    /// Run until the proxy closes the stream, shutdown is signalled or a
    /// fatal error occurs.
    pub async fn run(mut self) -> Result<(), StreamError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.recv() => {
                    tracing::debug!("Shutdown signalled, closing stream");
                    return Ok(());
                }
                next = self.inbound.next() => next,
            };

            let message = match next {
                None => {
                    tracing::debug!("Proxy closed the stream");
                    return Ok(());
                }
                Some(Err(status)) if status.code() == Code::Cancelled => {
                    tracing::debug!("Stream cancelled by proxy");
                    return Ok(());
                }
                Some(Err(status)) => return Err(StreamError::Receive(status)),
                Some(Ok(message)) => message,
            };

            self.handle(message).await?;
        }
    }

    /// Context accumulated so far.
    pub fn context(&self) -> &TransactionContext {
        &self.ctx
    }

    async fn handle(&mut self, message: ProcessingRequest) -> Result<(), StreamError> {
        let Some(request) = message.request else {
            tracing::warn!("Received a message without a processing phase");
            return Err(StreamError::UnknownPhase);
        };

        let phase = Phase::of(&request);
        let started = Instant::now();
        metrics::record_message(phase);
        tracing::debug!(phase = %phase, "Processing phase");

        self.ctx.record(&request);
        if phase == Phase::RequestHeaders {
            crate::observability::tracing::record_request_id(
                &tracing::Span::current(),
                self.ctx.request_id(),
            );
        }

        let reply = if phase.is_headers() {
            self.header_reply(phase).await?
        } else {
            passthrough_reply(phase)
        };

        reply
            .validate()
            .map_err(|source| StreamError::InvalidReply { phase, source })?;
        tracing::debug!(
            phase = %phase,
            reply = reply_phase(&reply).map_or("immediate_response", |answered| answered.as_str()),
            "Sending reply"
        );

        self.outbound
            .send(Ok(reply))
            .await
            .map_err(|_| StreamError::Send { phase })?;

        metrics::record_phase_duration(phase, started.elapsed());
        Ok(())
    }

    async fn header_reply(&mut self, phase: Phase) -> Result<ProcessingResponse, StreamError> {
        let mut mutation = MutationBuilder::new();
        let outcome = self.chain.run(phase, &mut self.ctx, &mut mutation).await?;

        let response = match outcome {
            ChainOutcome::Continue => {
                let headers = HeadersResponse {
                    response: Some(mutation.into_common_response()),
                };
                match phase {
                    Phase::RequestHeaders => Response::RequestHeaders(headers),
                    _ => Response::ResponseHeaders(headers),
                }
            }
            ChainOutcome::Immediate {
                processor,
                response,
            } => {
                tracing::info!(
                    phase = %phase,
                    processor = %processor,
                    status = response.status().as_u16(),
                    "Processor returned an immediate response"
                );
                metrics::record_immediate_response(phase, &processor);
                Response::ImmediateResponse(response.into_proto())
            }
        };

        Ok(ProcessingResponse {
            response: Some(response),
            ..Default::default()
        })
    }
}

/// Empty acknowledgement for body and trailer phases.
fn passthrough_reply(phase: Phase) -> ProcessingResponse {
    let response = match phase {
        Phase::RequestBody => Response::RequestBody(BodyResponse::default()),
        Phase::ResponseBody => Response::ResponseBody(BodyResponse::default()),
        Phase::RequestTrailers => Response::RequestTrailers(TrailersResponse::default()),
        Phase::ResponseTrailers => Response::ResponseTrailers(TrailersResponse::default()),
        Phase::RequestHeaders => Response::RequestHeaders(HeadersResponse::default()),
        Phase::ResponseHeaders => Response::ResponseHeaders(HeadersResponse::default()),
    };
    ProcessingResponse {
        response: Some(response),
        ..Default::default()
    }
}

/// Phase a reply answers. Immediate responses answer whatever phase was
/// pending, so they map to `None`.
fn reply_phase(reply: &ProcessingResponse) -> Option<Phase> {
    match reply.response.as_ref()? {
        Response::RequestHeaders(_) => Some(Phase::RequestHeaders),
        Response::ResponseHeaders(_) => Some(Phase::ResponseHeaders),
        Response::RequestBody(_) => Some(Phase::RequestBody),
        Response::ResponseBody(_) => Some(Phase::ResponseBody),
        Response::RequestTrailers(_) => Some(Phase::RequestTrailers),
        Response::ResponseTrailers(_) => Some(Phase::ResponseTrailers),
        Response::ImmediateResponse(_) => None,
    }
}
