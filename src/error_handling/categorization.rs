//! Error categorization and retry strategy.
//!
//! This module maps transport errors and provider responses onto the mission
//! error taxonomy and probe failure classes, and configures the page fetch
//! retry strategy.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{MissionErrorKind, ProbeError};

/// Creates an exponential backoff retry strategy for the page fetch.
///
/// Returns a retry strategy configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Backoff factor: `RETRY_FACTOR`
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
/// - Maximum retries: `RETRY_MAX_ATTEMPTS`
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS)
}

/// Categorizes a `reqwest::Error` raised while talking to the model API.
///
/// Transport failures (connect, timeout) are `Network`; status-bearing errors
/// go through [`categorize_provider_status`].
pub fn categorize_reqwest_error(error: &reqwest::Error) -> MissionErrorKind {
    if let Some(status) = error.status() {
        return categorize_provider_status(status.as_u16(), "");
    }

    if error.is_timeout() || error.is_connect() || error.is_request() {
        MissionErrorKind::Network
    } else {
        MissionErrorKind::Unknown
    }
}

/// Categorizes a non-success model API response by status code and body.
///
/// The body is consulted because the API reports an invalid key as a plain
/// 400 and quota exhaustion as `RESOURCE_EXHAUSTED`.
pub fn categorize_provider_status(status: u16, body: &str) -> MissionErrorKind {
    let body_lower = body.to_lowercase();

    if body_lower.contains("api key not valid")
        || body_lower.contains("api_key_invalid")
        || body_lower.contains("permission_denied")
    {
        return MissionErrorKind::ApiKey;
    }
    if body_lower.contains("resource_exhausted") {
        return MissionErrorKind::RateLimit;
    }
    if body_lower.contains("overloaded") || body_lower.contains("unavailable") {
        return MissionErrorKind::ServiceBusy;
    }

    match status {
        401 | 403 => MissionErrorKind::ApiKey,
        crate::config::HTTP_STATUS_TOO_MANY_REQUESTS => MissionErrorKind::RateLimit,
        500 | 502 | 503 | 504 => MissionErrorKind::ServiceBusy,
        _ => MissionErrorKind::Unknown,
    }
}

/// Classifies a `reqwest::Error` raised by an HTTP probe.
///
/// Probe transport errors are never fatal here; whether the target exists at
/// all is decided by the DNS probe.
pub fn categorize_probe_error(error: &reqwest::Error) -> ProbeError {
    if let Some(status) = error.status() {
        ProbeError::Status(status.as_u16())
    } else if error.is_timeout() {
        ProbeError::Timeout(error.to_string())
    } else if error.is_decode() {
        ProbeError::Upstream(error.to_string())
    } else {
        ProbeError::Other(error.to_string())
    }
}
