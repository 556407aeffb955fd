//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::Config;

/// Maximum redirects followed by the page fetch and the HTTP probes.
const MAX_REDIRECTS: usize = 10;

/// Initializes the HTTP client shared by the page fetch and the HTTP probes.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the configuration
/// - Per-request timeout from the configuration
/// - Redirect following (up to 10 hops)
/// - Rustls TLS backend (no native TLS)
///
/// `reqwest::Client` is reference-counted internally; clone it freely.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}
