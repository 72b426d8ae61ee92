//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI overrides (main.rs)
//!     → ExtProcConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_str, ConfigError};
pub use schema::{
    DiagnosticsConfig, ExtProcConfig, GrpcConfig, LogFormat, ObservabilityConfig,
    ProcessorsConfig, RequestIdConfig, SetCookieConfig, ShutdownConfig,
};
pub use validation::{validate_config, ValidationError};
