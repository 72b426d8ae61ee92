//! gRPC server setup.
//!
//! # Responsibilities
//! - Mount the `ExternalProcessor` service on a tonic server
//! - Serve connections from a pre-bound listener
//! - Stop accepting when shutdown is signalled

use thiserror::Error;
use tonic::transport::Server;

use super::service::ExtProcService;
use crate::lifecycle::ShutdownSignal;
use crate::net::Listener;
use crate::proto::ExternalProcessorServer;

/// Error type for the serving loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

/// gRPC endpoint for the proxy.
pub struct GrpcServer {
    service: ExtProcService,
    max_message_bytes: usize,
}

impl GrpcServer {
    pub fn new(service: ExtProcService) -> Self {
        Self {
            service,
            max_message_bytes: 4 * 1024 * 1024,
        }
    }

    /// Largest phase message accepted from the proxy.
    pub fn max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = limit;
        self
    }

    /// Serve until `shutdown` fires and open connections have closed.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr();
        tracing::info!(address = %addr, "gRPC server starting");

        let service = ExternalProcessorServer::new(self.service)
            .max_decoding_message_size(self.max_message_bytes);

        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(listener.into_incoming(), async move {
                shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "gRPC server stopped");
        Ok(())
    }
}
