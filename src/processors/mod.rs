//! Built-in processors.
//!
//! # Responsibilities
//! - Provide the reference processors shipped with the server
//! - Assemble the configured chain at startup
//!
//! The request id echo runs before the cookie rewrite; neither depends on
//! the other's output.

pub mod request_id;
pub mod set_cookie;

pub use request_id::RequestIdProcessor;
pub use set_cookie::SetCookieProcessor;

use crate::config::ProcessorsConfig;
use crate::headers::cookie::UnknownSameSite;
use crate::processing::ProcessorChain;

/// Build the processor chain described by the configuration.
pub fn build_chain(config: &ProcessorsConfig) -> Result<ProcessorChain, UnknownSameSite> {
    let mut chain = ProcessorChain::new();
    if config.request_id.enabled {
        chain = chain.with(RequestIdProcessor::from_config(&config.request_id));
    }
    if config.set_cookie.enabled {
        chain = chain.with(SetCookieProcessor::from_config(&config.set_cookie)?);
    }
    Ok(chain)
}
