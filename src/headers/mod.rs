//! Header and cookie encoding helpers.
//!
//! # Responsibilities
//! - Canonicalize header names (lower-case) and store multi-valued headers
//! - Pick the cooked or raw representation of a wire header value
//! - Parse `cookie` / `set-cookie` lines and render cookies back
//!
//! # Design Decisions
//! - Pure functions and plain values, no I/O and no shared state
//! - Pseudo-headers (`:path`, `:status`, ...) are ordinary keys here

pub mod cookie;
pub mod map;

pub use cookie::{parse_cookie_line, parse_set_cookie, Cookie, SameSite};
pub use map::{canonical_key, header_text, Headers};
