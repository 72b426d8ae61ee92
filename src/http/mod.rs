//! Diagnostic HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → diagnostics.rs (echo request headers / emit requested headers)
//!     → JSON response
//! ```

pub mod diagnostics;
pub mod server;

pub use server::DiagnosticsServer;
