//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (pacing, retry policy, TTLs, timeouts)
//! - HTTP header name constants
//! - The library `Config` and the CLI option types

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{Config, LogFormat, LogLevel, Opt, API_KEY_ENV_VARS};
