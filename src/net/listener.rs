//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Hand the bound socket to the gRPC server (as an incoming stream) or the
//!   diagnostics server (as a plain `TcpListener`)
//!
//! Binding happens before any server starts, so a bad address fails startup
//! instead of surfacing later from a background task.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    Address(String, std::net::AddrParseError),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(addr, e) => write!(f, "Invalid address {}: {}", addr, e),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Address(_, e) => Some(e),
            ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// A bound TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address` (`host:port`; port `0` picks a free port).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ListenerError::Address(address.to_string(), e))?;

        let inner = TcpListener::bind(addr)
            .await
            .map_err(|e| ListenerError::Bind(addr, e))?;
        let local_addr = inner.local_addr().map_err(|e| ListenerError::Bind(addr, e))?;

        tracing::debug!(address = %local_addr, "Listener bound");
        Ok(Self { inner, local_addr })
    }

    /// Address actually bound, with the resolved port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepted connections as a stream, for tonic.
    pub fn into_incoming(self) -> TcpListenerStream {
        TcpListenerStream::new(self.inner)
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn bind_rejects_bad_address() {
        let err = Listener::bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, ListenerError::Address(..)));
        assert!(err.to_string().starts_with("Invalid address not-an-address"));
    }
}
