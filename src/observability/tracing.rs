//! Span helpers.
//!
//! Each stream runs inside one `stream` span, so every event a processor
//! logs carries the stream id and, once known, the request id.

use tracing::Span;

use crate::net::StreamId;

/// Root span for one `Process` stream.
///
/// `request_id` starts empty and is recorded when the request headers
/// arrive.
pub fn stream_span(id: StreamId) -> Span {
    tracing::info_span!("stream", stream_id = %id, request_id = tracing::field::Empty)
}

/// Attach the request id to the current stream span.
pub fn record_request_id(span: &Span, request_id: &str) {
    if !request_id.is_empty() {
        span.record("request_id", request_id);
    }
}
