//! Envoy external processing (ext_proc) server library.

pub mod config;
pub mod grpc;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod processing;
pub mod processors;
pub mod proto;

pub use config::ExtProcConfig;
pub use lifecycle::Shutdown;
pub use processing::{
    ImmediateResponse, MutationBuilder, Processor, ProcessorChain, ProcessorError,
    ProcessorResult, TransactionContext,
};
