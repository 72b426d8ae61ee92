//! Stream-level failures.

use thiserror::Error;
use tonic::Status;

use super::phase::Phase;
use super::processor::ProcessorError;
use crate::proto::ValidationError;

/// Reasons a stream terminates abnormally.
///
/// Every variant is fatal to its own stream only.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to receive from proxy: {0}")]
    Receive(Status),

    #[error("processor {processor} failed during {phase}: {source}")]
    Processor {
        phase: Phase,
        processor: String,
        #[source]
        source: ProcessorError,
    },

    #[error("processor {processor} produced an invalid mutation during {phase}: {source}")]
    InvalidMutation {
        phase: Phase,
        processor: String,
        #[source]
        source: ValidationError,
    },

    #[error("invalid {phase} reply: {source}")]
    InvalidReply {
        phase: Phase,
        #[source]
        source: ValidationError,
    },

    #[error("response stream closed while sending {phase} reply")]
    Send { phase: Phase },

    #[error("message carries no known processing phase")]
    UnknownPhase,
}

impl StreamError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::Receive(_) => "receive",
            StreamError::Processor { .. } => "processor",
            StreamError::InvalidMutation { .. } => "invalid_mutation",
            StreamError::InvalidReply { .. } => "invalid_reply",
            StreamError::Send { .. } => "send",
            StreamError::UnknownPhase => "unknown_phase",
        }
    }
}

impl From<StreamError> for Status {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::UnknownPhase => Status::invalid_argument(err.to_string()),
            other => Status::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::Processor {
            phase: Phase::ResponseHeaders,
            processor: "set_cookie".into(),
            source: ProcessorError::Failed("boom".into()),
        };
        assert_eq!(
            err.to_string(),
            "processor set_cookie failed during ResponseHeaders: processor failed: boom"
        );

        let err = StreamError::Send {
            phase: Phase::RequestBody,
        };
        assert_eq!(err.to_string(), "response stream closed while sending RequestBody reply");
    }

    #[test]
    fn test_status_mapping() {
        let status: Status = StreamError::UnknownPhase.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: Status = StreamError::Receive(Status::unavailable("reset")).into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("reset"));

        let status: Status = StreamError::InvalidReply {
            phase: Phase::RequestHeaders,
            source: ValidationError::Missing { field: "x" },
        }
        .into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(StreamError::UnknownPhase.kind(), "unknown_phase");
        assert_eq!(
            StreamError::Send {
                phase: Phase::ResponseBody
            }
            .kind(),
            "send"
        );
    }
}
