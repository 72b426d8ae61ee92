//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the external processor.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ExtProcConfig {
    /// gRPC endpoint the proxy connects to.
    pub grpc: GrpcConfig,

    /// Diagnostic HTTP endpoint.
    pub diagnostics: DiagnosticsConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Built-in processors, in chain order.
    pub processors: ProcessorsConfig,

    /// Graceful shutdown behavior.
    pub shutdown: ShutdownConfig,
}

/// gRPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GrpcConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,

    /// Replies buffered per stream before the handler waits on the transport.
    pub response_buffer: usize,

    /// Largest accepted phase message, in bytes.
    pub max_message_bytes: usize,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            response_buffer: 8,
            max_message_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Diagnostic HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Built-in processor settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProcessorsConfig {
    pub request_id: RequestIdConfig,
    pub set_cookie: SetCookieConfig,
}

/// Echo the request id onto the response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RequestIdConfig {
    pub enabled: bool,

    /// Response header that receives the request id.
    pub header: String,
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header: "x-request-id".to_string(),
        }
    }
}

/// Rewrite `set-cookie` attributes on responses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SetCookieConfig {
    pub enabled: bool,

    /// `Strict`, `Lax` or `None` (case-insensitive).
    pub same_site: String,

    /// Add `HttpOnly` to every cookie.
    pub force_http_only: bool,
}

impl Default for SetCookieConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            same_site: "Strict".to_string(),
            force_http_only: false,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time in-flight streams get to finish before the process exits.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}
