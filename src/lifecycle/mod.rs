//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build processor chain → Bind listeners → Spawn servers
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain streams → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Second SIGTERM/SIGINT → Forced exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then chain, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{run, start, App, StartupError};
