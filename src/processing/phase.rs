//! Processing phases of one HTTP transaction.

use std::fmt;

use crate::proto::processing_request::Request;

/// One of the six message kinds the proxy sends per transaction.
///
/// The proxy delivers them in the order declared here, skipping the ones its
/// processing mode disables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    RequestHeaders,
    RequestBody,
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
}

impl Phase {
    pub fn of(request: &Request) -> Self {
        match request {
            Request::RequestHeaders(_) => Phase::RequestHeaders,
            Request::RequestBody(_) => Phase::RequestBody,
            Request::RequestTrailers(_) => Phase::RequestTrailers,
            Request::ResponseHeaders(_) => Phase::ResponseHeaders,
            Request::ResponseBody(_) => Phase::ResponseBody,
            Request::ResponseTrailers(_) => Phase::ResponseTrailers,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::RequestHeaders => "RequestHeaders",
            Phase::RequestBody => "RequestBody",
            Phase::RequestTrailers => "RequestTrailers",
            Phase::ResponseHeaders => "ResponseHeaders",
            Phase::ResponseBody => "ResponseBody",
            Phase::ResponseTrailers => "ResponseTrailers",
        }
    }

    /// Header phases run the processor chain; the others are acknowledged.
    pub fn is_headers(&self) -> bool {
        matches!(self, Phase::RequestHeaders | Phase::ResponseHeaders)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
