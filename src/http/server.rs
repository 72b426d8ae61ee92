//! Diagnostic HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the diagnostic handlers
//! - Wire up request tracing
//! - Serve on a pre-bound listener until shutdown

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::http::diagnostics;
use crate::lifecycle::ShutdownSignal;
use crate::net::Listener;

/// HTTP server exposing `/headers` and `/response-headers`.
pub struct DiagnosticsServer {
    router: Router,
}

impl DiagnosticsServer {
    pub fn new() -> Self {
        Self {
            router: Self::build_router(),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router() -> Router {
        Router::new()
            .route("/headers", get(diagnostics::request_headers))
            .route("/response-headers", get(diagnostics::response_headers))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr();
        tracing::info!(address = %addr, "Diagnostics server starting");

        axum::serve(listener.into_inner(), self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("Diagnostics server stopped");
        Ok(())
    }
}

impl Default for DiagnosticsServer {
    fn default() -> Self {
        Self::new()
    }
}
