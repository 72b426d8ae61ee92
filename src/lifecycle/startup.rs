//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the processor chain from validated configuration
//! - Bind listeners and spawn the gRPC and diagnostics servers
//! - Coordinate graceful shutdown with a drain deadline
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every listener is bound before any server starts, so a port conflict
//!   never leaves a half-started process
//! - Shutdown has a deadline: streams still open after it are abandoned

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::ExtProcConfig;
use crate::grpc::{ExtProcService, GrpcServer, ServerError};
use crate::headers::cookie::UnknownSameSite;
use crate::http::DiagnosticsServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError, StreamTracker};
use crate::observability::metrics;
use crate::processors::build_chain;

/// Fatal errors while starting, running or stopping the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid processor configuration: {0}")]
    Processors(#[from] UnknownSameSite),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Running servers and the handles needed to stop them.
pub struct App {
    grpc_addr: SocketAddr,
    diagnostics_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    tracker: StreamTracker,
    tasks: Vec<JoinHandle<Result<(), ServerError>>>,
}

impl App {
    pub fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    pub fn diagnostics_addr(&self) -> Option<SocketAddr> {
        self.diagnostics_addr
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }

    /// Trigger shutdown and wait for servers and streams to finish.
    ///
    /// Returns once everything has stopped or `drain` has elapsed, whichever
    /// comes first.
    pub async fn stop(self, drain: Duration) -> Result<(), StartupError> {
        self.shutdown.trigger();
        tracing::info!(
            active_streams = self.tracker.active_count(),
            drain_timeout_secs = drain.as_secs(),
            "Draining"
        );

        let tracker = self.tracker.clone();
        let tasks = self.tasks;
        let drained = tokio::time::timeout(drain, async move {
            for task in tasks {
                task.await??;
            }
            tracker.wait_for_drain(drain).await;
            Ok::<(), StartupError>(())
        })
        .await;

        match drained {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    active_streams = self.tracker.active_count(),
                    "Drain deadline reached, abandoning open streams"
                );
                Ok(())
            }
        }
    }
}

/// Bind listeners and spawn every server described by `config`.
pub async fn start(config: &ExtProcConfig) -> Result<App, StartupError> {
    let chain = Arc::new(build_chain(&config.processors)?);
    tracing::info!(processors = ?chain.names(), "Processor chain built");

    let grpc_listener = Listener::bind(&config.grpc.bind_address).await?;
    let diagnostics_listener = if config.diagnostics.enabled {
        Some(Listener::bind(&config.diagnostics.bind_address).await?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let tracker = StreamTracker::new();
    let grpc_addr = grpc_listener.local_addr();
    let diagnostics_addr = diagnostics_listener.as_ref().map(Listener::local_addr);

    let mut tasks = Vec::new();

    let service = ExtProcService::new(chain, shutdown.clone(), tracker.clone())
        .response_buffer(config.grpc.response_buffer);
    let grpc = GrpcServer::new(service).max_message_bytes(config.grpc.max_message_bytes);
    let signal = shutdown.subscribe();
    tasks.push(tokio::spawn(async move { grpc.run(grpc_listener, signal).await }));

    if let Some(listener) = diagnostics_listener {
        let signal = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            DiagnosticsServer::new()
                .run(listener, signal)
                .await
                .map_err(ServerError::from)
        }));
    }

    Ok(App {
        grpc_addr,
        diagnostics_addr,
        shutdown,
        tracker,
        tasks,
    })
}

/// Run the server until SIGINT/SIGTERM, then drain.
///
/// A second signal during the drain exits immediately.
pub async fn run(config: ExtProcConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e| ListenerError::Address(config.observability.metrics_address.clone(), e))?;
        metrics::init_metrics(addr)?;
    }

    let app = start(&config).await?;
    tracing::info!(
        grpc_address = %app.grpc_addr(),
        diagnostics_address = ?app.diagnostics_addr(),
        "ext-proc ready"
    );

    let signal = signals::recv_signal().await.map_err(StartupError::Signal)?;
    tracing::info!(signal = %signal, "Shutdown signal received");

    let drain = Duration::from_secs(config.shutdown.drain_timeout_secs);
    tokio::select! {
        result = app.stop(drain) => result,
        second = signals::recv_signal() => {
            if let Ok(signal) = second {
                tracing::warn!(signal = %signal, "Second signal received, forcing exit");
            }
            Ok(())
        }
    }
}
