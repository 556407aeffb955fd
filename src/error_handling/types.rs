//! Error type definitions.
//!
//! This module defines the initialization errors, the probe failure
//! classification and the mission error taxonomy surfaced to callers.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    DnsResolverError(String),

    /// Error initializing the analysis provider.
    #[error("Analysis provider initialization error: {0}")]
    ProviderError(#[from] MissionError),
}

/// Classification of a mission failure.
///
/// Serialized with the snake_case tags the presentation layer switches on
/// (`api_key`, `network`, `rate_limit`, `service_busy`, `unknown`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MissionErrorKind {
    /// Missing or rejected model API credential
    ApiKey,
    /// Target unreachable, DNS failure, or the model API could not be reached
    Network,
    /// Upstream rate limit (HTTP 429 / quota exhausted)
    RateLimit,
    /// Upstream temporarily overloaded (HTTP 5xx)
    ServiceBusy,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for MissionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MissionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionErrorKind::ApiKey => "api_key",
            MissionErrorKind::Network => "network",
            MissionErrorKind::RateLimit => "rate_limit",
            MissionErrorKind::ServiceBusy => "service_busy",
            MissionErrorKind::Unknown => "unknown",
        }
    }

    /// Transient kinds are retried by the AI gateway; all others are terminal
    /// on the first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MissionErrorKind::RateLimit | MissionErrorKind::ServiceBusy
        )
    }

    /// Short remediation hint shown alongside the error.
    pub fn remediation(&self) -> &'static str {
        match self {
            MissionErrorKind::ApiKey => {
                "Set GEMINI_API_KEY (or API_KEY) in the environment or .env file and check that the key is enabled for the Generative Language API."
            }
            MissionErrorKind::Network => {
                "Check that the target URL is spelled correctly and resolves from this network."
            }
            MissionErrorKind::RateLimit => {
                "The model API quota is exhausted. Wait a minute before starting another mission."
            }
            MissionErrorKind::ServiceBusy => {
                "The model API is overloaded. Try again shortly or use a lighter scan level."
            }
            MissionErrorKind::Unknown => "Retry the mission; if it keeps failing, run with --log-level debug.",
        }
    }
}

/// Terminal mission failure.
///
/// A mission that produced a `MissionError` never delivers a report.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct MissionError {
    /// Failure classification
    #[serde(rename = "type")]
    pub kind: MissionErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl MissionError {
    pub fn new(kind: MissionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn api_key(message: impl Into<String>) -> Self {
        Self::new(MissionErrorKind::ApiKey, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(MissionErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(MissionErrorKind::Unknown, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Failure of a single probe.
///
/// Only [`ProbeError::Unreachable`] is fatal to a mission; every other variant
/// degrades to an absent result for that probe kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The target provably cannot be reached (no such host, no addresses).
    #[error("target unreachable: {0}")]
    Unreachable(String),

    /// The probe did not finish within its timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The probe provider answered with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The probe provider answered but reported an error or malformed data.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Anything else (connection reset, TLS failure, ...).
    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::Unreachable(_))
    }
}

impl From<ProbeError> for MissionError {
    fn from(error: ProbeError) -> Self {
        match error {
            ProbeError::Unreachable(detail) => {
                MissionError::network(format!("Target unreachable: {detail}"))
            }
            other => MissionError::unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mission_error_kind_as_str() {
        assert_eq!(MissionErrorKind::ApiKey.as_str(), "api_key");
        assert_eq!(MissionErrorKind::Network.as_str(), "network");
        assert_eq!(MissionErrorKind::RateLimit.as_str(), "rate_limit");
        assert_eq!(MissionErrorKind::ServiceBusy.as_str(), "service_busy");
        assert_eq!(MissionErrorKind::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_only_rate_limit_and_service_busy_are_transient() {
        let transient: Vec<_> = MissionErrorKind::iter()
            .filter(|k| k.is_transient())
            .collect();
        assert_eq!(
            transient,
            vec![MissionErrorKind::RateLimit, MissionErrorKind::ServiceBusy]
        );
    }

    #[test]
    fn test_all_kinds_have_remediation() {
        for kind in MissionErrorKind::iter() {
            assert!(
                !kind.remediation().is_empty(),
                "{:?} should have a remediation hint",
                kind
            );
        }
    }

    #[test]
    fn test_mission_error_serializes_with_type_tag() {
        let error = MissionError::new(MissionErrorKind::RateLimit, "quota exhausted");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "rate_limit");
        assert_eq!(json["message"], "quota exhausted");
        assert_eq!(error.to_string(), "rate_limit: quota exhausted");
    }

    #[test]
    fn test_probe_error_fatality() {
        assert!(ProbeError::Unreachable("nxdomain".into()).is_fatal());
        assert!(!ProbeError::Timeout("ssl grade".into()).is_fatal());
        assert!(!ProbeError::Status(503).is_fatal());
        assert!(!ProbeError::Upstream("ERROR".into()).is_fatal());
        assert!(!ProbeError::Other("reset".into()).is_fatal());
    }

    #[test]
    fn test_unreachable_probe_maps_to_network_error() {
        let error: MissionError = ProbeError::Unreachable("no such host".into()).into();
        assert_eq!(error.kind, MissionErrorKind::Network);
        assert!(error.message.contains("no such host"));
    }
}
