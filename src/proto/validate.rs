//! Structural validation of replies before they are sent to the proxy.
//!
//! The rules mirror the constraints declared on the protocol schema: the proxy
//! rejects a reply that breaks any of them, and the whole HTTP transaction
//! fails with it.

use thiserror::Error;

use super::{
    processing_response::Response, BodyResponse, CommonResponse, HeaderAppendAction,
    HeaderMutation, HeaderValue, HeaderValueOption, HeadersResponse, HttpStatus,
    ImmediateResponse, ProcessingResponse, ResponseStatus, TrailersResponse,
};

/// Maximum size of a header key or value, in bytes.
pub const MAX_HEADER_BYTES: usize = 16384;

/// HTTP status codes defined by `envoy.type.v3.StatusCode`.
const DEFINED_STATUS_CODES: &[i32] = &[
    100, 200, 201, 202, 203, 204, 205, 206, 207, 208, 226, 300, 301, 302, 303, 304, 305, 307, 308,
    400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 421,
    422, 423, 424, 426, 428, 429, 431, 500, 501, 502, 503, 504, 505, 506, 507, 508, 510, 511,
];

/// A reply field that violates the protocol schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: value length must be at least 1 byte")]
    Empty { field: &'static str },

    #[error("{field}: value length must be at most 16384 bytes, got {len}")]
    TooLong { field: &'static str, len: usize },

    #[error("{field}: value must not contain NUL, CR or LF")]
    IllegalCharacter { field: &'static str },

    #[error("{field}: value is required")]
    Missing { field: &'static str },

    #[error("{field}: value must be one of the defined enum values, got {value}")]
    UndefinedEnum { field: &'static str, value: i32 },
}

/// Types that can be checked against the protocol schema.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn check_header_text(field: &'static str, bytes: &[u8]) -> Result<(), ValidationError> {
    if bytes.len() > MAX_HEADER_BYTES {
        return Err(ValidationError::TooLong {
            field,
            len: bytes.len(),
        });
    }
    if bytes.iter().any(|b| matches!(b, b'\0' | b'\r' | b'\n')) {
        return Err(ValidationError::IllegalCharacter { field });
    }
    Ok(())
}

impl Validate for HeaderValue {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::Empty {
                field: "HeaderValue.key",
            });
        }
        check_header_text("HeaderValue.key", self.key.as_bytes())?;
        check_header_text("HeaderValue.value", self.value.as_bytes())?;
        if self.raw_value.len() > MAX_HEADER_BYTES {
            return Err(ValidationError::TooLong {
                field: "HeaderValue.raw_value",
                len: self.raw_value.len(),
            });
        }
        Ok(())
    }
}

impl Validate for HeaderValueOption {
    fn validate(&self) -> Result<(), ValidationError> {
        let header = self.header.as_ref().ok_or(ValidationError::Missing {
            field: "HeaderValueOption.header",
        })?;
        header.validate()?;
        if HeaderAppendAction::try_from(self.append_action).is_err() {
            return Err(ValidationError::UndefinedEnum {
                field: "HeaderValueOption.append_action",
                value: self.append_action,
            });
        }
        Ok(())
    }
}

impl Validate for HeaderMutation {
    fn validate(&self) -> Result<(), ValidationError> {
        self.set_headers.iter().try_for_each(Validate::validate)
    }
}

impl Validate for CommonResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        if ResponseStatus::try_from(self.status).is_err() {
            return Err(ValidationError::UndefinedEnum {
                field: "CommonResponse.status",
                value: self.status,
            });
        }
        if let Some(mutation) = &self.header_mutation {
            mutation.validate()?;
        }
        if let Some(trailers) = &self.trailers {
            trailers.headers.iter().try_for_each(Validate::validate)?;
        }
        Ok(())
    }
}

impl Validate for HttpStatus {
    fn validate(&self) -> Result<(), ValidationError> {
        if !DEFINED_STATUS_CODES.contains(&self.code) {
            return Err(ValidationError::UndefinedEnum {
                field: "HttpStatus.code",
                value: self.code,
            });
        }
        Ok(())
    }
}

impl Validate for ImmediateResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        self.status
            .as_ref()
            .ok_or(ValidationError::Missing {
                field: "ImmediateResponse.status",
            })?
            .validate()?;
        if let Some(headers) = &self.headers {
            headers.validate()?;
        }
        Ok(())
    }
}

impl Validate for HeadersResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        self.response.as_ref().map_or(Ok(()), Validate::validate)
    }
}

impl Validate for BodyResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        self.response.as_ref().map_or(Ok(()), Validate::validate)
    }
}

impl Validate for TrailersResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        self.header_mutation.as_ref().map_or(Ok(()), Validate::validate)
    }
}

impl Validate for ProcessingResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.response {
            None => Err(ValidationError::Missing {
                field: "ProcessingResponse.response",
            }),
            Some(Response::RequestHeaders(r)) | Some(Response::ResponseHeaders(r)) => r.validate(),
            Some(Response::RequestBody(r)) | Some(Response::ResponseBody(r)) => r.validate(),
            Some(Response::RequestTrailers(r)) | Some(Response::ResponseTrailers(r)) => r.validate(),
            Some(Response::ImmediateResponse(r)) => r.validate(),
        }
    }
}
