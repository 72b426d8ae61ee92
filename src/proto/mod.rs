//! Wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP/2 stream from the proxy
//!     → external_processor_server (tonic routing, prost codec)
//!     → decoded ProcessingRequest
//!     → processing engine
//!     → validate.rs (schema checks on the reply)
//!     → ProcessingResponse back on the same stream
//! ```
//!
//! # Design Decisions
//! - Messages and server glue come from `envoy-types`, pre-generated from the
//!   Envoy API protos, so no `protoc` is needed at build time
//! - Validation returns the first violation, like the schema's `Validate()`

pub mod validate;

pub use envoy_types::pb::envoy::config::core::v3::{
    header_value_option::HeaderAppendAction, HeaderMap, HeaderValue, HeaderValueOption,
};
pub use envoy_types::pb::envoy::r#type::v3::HttpStatus;
pub use envoy_types::pb::envoy::service::ext_proc::v3::external_processor_server::{
    ExternalProcessor, ExternalProcessorServer,
};
pub use envoy_types::pb::envoy::service::ext_proc::v3::{
    body_mutation, common_response::ResponseStatus, processing_request, processing_response,
    BodyMutation, BodyResponse, CommonResponse, GrpcStatus, HeaderMutation, HeadersResponse,
    HttpBody, HttpHeaders, HttpTrailers, ImmediateResponse, ProcessingRequest, ProcessingResponse,
    TrailersResponse,
};
pub use envoy_types::pb::google::protobuf::BoolValue;

pub use self::validate::{Validate, ValidationError};

/// Fully qualified name of the external processing service.
pub const SERVICE_NAME: &str = "envoy.service.ext_proc.v3.ExternalProcessor";

/// Fully qualified path of the `Process` RPC.
pub const PROCESS_PATH: &str = "/envoy.service.ext_proc.v3.ExternalProcessor/Process";
