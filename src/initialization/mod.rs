//! Shared resource initialization.
//!
//! This module provides functions to initialize the resources a mission
//! controller shares across missions:
//! - The HTTP client used by the page fetch and the HTTP probes
//! - The DNS resolver used by the DNS probe
//! - The process-wide rustls crypto provider
//! - The logger

mod client;
mod logger;
mod resolver;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. Call this before the
/// first TLS probe runs.
pub fn init_crypto_provider() {
    // Reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}
