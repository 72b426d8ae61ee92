//! Protocol engine subsystem.
//!
//! # Data Flow
//! ```text
//! ProcessingRequest (one phase)
//!     → stream.rs (receive loop, one reply per message)
//!     → context.rs (fold headers, derive URL / status / cookies)
//!     → processor.rs (chain runs on header phases)
//!         → mutation.rs (fresh builder per phase)
//!         → immediate.rs (short-circuit, discards the builder)
//!     → ProcessingResponse (validated) back to the proxy
//! ```
//!
//! # Design Decisions
//! - One handler and one context per stream; nothing is shared between
//!   streams except the read-only processor chain
//! - Phases are a closed enum; a message with no phase is a protocol error
//! - Processors see `&mut` context and builder, never aliased

pub mod context;
pub mod error;
pub mod immediate;
pub mod mutation;
pub mod phase;
pub mod processor;
pub mod stream;

pub use context::{Metadata, MetadataValue, RequestUrl, TransactionContext};
pub use error::StreamError;
pub use immediate::ImmediateResponse;
pub use mutation::{encode_header, BodyReplacement, MutationBuilder, StatusDirective};
pub use phase::Phase;
pub use processor::{ChainOutcome, Processor, ProcessorChain, ProcessorError, ProcessorResult};
pub use stream::{ReplySender, StreamHandler};
