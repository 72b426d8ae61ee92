//! gRPC transport subsystem.
//!
//! # Data Flow
//! ```text
//! Listener (net)
//!     → server.rs (tonic server, HTTP/2)
//!     → envoy-types ExternalProcessorServer (route /Process, prost codec)
//!     → service.rs (one task per stream, tracked and instrumented)
//!     → processing::StreamHandler
//! ```
//!
//! # Design Decisions
//! - Stream errors are reported as the final status of that stream only
//! - New streams are refused once shutdown has been triggered

pub mod server;
pub mod service;

pub use server::{GrpcServer, ServerError};
pub use service::ExtProcService;
