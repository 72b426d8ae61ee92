//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (bind, local address)
//!     → gRPC server / diagnostics server (accept loop)
//!     → connection.rs (one guard per open Process stream)
//! ```
//!
//! # Design Decisions
//! - Listeners are bound before servers start (fail fast on bad addresses)
//! - Each stream is tracked for graceful shutdown

pub mod connection;
pub mod listener;

pub use connection::{StreamGuard, StreamId, StreamTracker};
pub use listener::{Listener, ListenerError};
