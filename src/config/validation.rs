//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, value ranges and enum-like strings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ExtProcConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ExtProcConfig;
use crate::headers::SameSite;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: unknown value {value:?}")]
    UnknownValue { field: &'static str, value: String },

    #[error("{field}: invalid header name {value:?}")]
    InvalidHeaderName { field: &'static str, value: String },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ExtProcConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "grpc.bind_address", &config.grpc.bind_address);
    if config.grpc.response_buffer == 0 {
        errors.push(ValidationError::Zero {
            field: "grpc.response_buffer",
        });
    }
    if config.grpc.max_message_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "grpc.max_message_bytes",
        });
    }

    if config.diagnostics.enabled {
        check_address(
            &mut errors,
            "diagnostics.bind_address",
            &config.diagnostics.bind_address,
        );
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownValue {
            field: "observability.log_level",
            value: observability.log_level.clone(),
        });
    }
    if observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &observability.metrics_address,
        );
    }

    let processors = &config.processors;
    if processors.set_cookie.enabled && processors.set_cookie.same_site.parse::<SameSite>().is_err()
    {
        errors.push(ValidationError::UnknownValue {
            field: "processors.set_cookie.same_site",
            value: processors.set_cookie.same_site.clone(),
        });
    }
    if processors.request_id.enabled && !is_header_name(&processors.request_id.header) {
        errors.push(ValidationError::InvalidHeaderName {
            field: "processors.request_id.header",
            value: processors.request_id.header.clone(),
        });
    }

    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "shutdown.drain_timeout_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn is_header_name(name: &str) -> bool {
    axum::http::HeaderName::from_bytes(name.as_bytes()).is_ok()
}
