//! Short-circuit replies.

use axum::http::StatusCode;

use crate::proto::{self, GrpcStatus, HeaderAppendAction, HeaderMutation, HttpStatus};

use super::mutation::encode_header;

/// Tells the proxy to answer the client directly and skip the upstream.
///
/// Returned by a processor to stop the chain; whatever the chain had
/// accumulated so far for the phase is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmediateResponse {
    status: StatusCode,
    headers: Vec<(String, String, HeaderAppendAction)>,
    body: Vec<u8>,
    details: String,
    grpc_status: Option<u32>,
}

impl ImmediateResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            details: String::new(),
            grpc_status: None,
        }
    }

    /// Set a header on the local reply, overwriting any earlier value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((
            key.into(),
            value.into(),
            HeaderAppendAction::OverwriteIfExistsOrAdd,
        ));
        self
    }

    pub fn append_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((key.into(), value.into(), HeaderAppendAction::AppendIfExistsOrAdd));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Free-form text the proxy records in its access log.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// gRPC status to report when the downstream request is itself gRPC.
    pub fn grpc_status(mut self, code: tonic::Code) -> Self {
        self.grpc_status = Some(code as u32);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn into_proto(self) -> proto::ImmediateResponse {
        let headers = (!self.headers.is_empty()).then(|| HeaderMutation {
            set_headers: self
                .headers
                .iter()
                .map(|(key, value, action)| encode_header(key, value, *action))
                .collect(),
            remove_headers: Vec::new(),
        });
        proto::ImmediateResponse {
            status: Some(HttpStatus {
                code: i32::from(self.status.as_u16()),
            }),
            headers,
            body: self.body,
            grpc_status: self.grpc_status.map(|status| GrpcStatus { status }),
            details: self.details,
        }
    }
}
