//! Probe data types.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::config::{
    DNS_TTL, GEO_TTL, HTTP_HEADERS_TTL, SSL_GRADE_TTL, TLS_CERTIFICATE_TTL, WELL_KNOWN_TTL,
};
use crate::error_handling::ProbeError;

use super::target::ProbeTarget;

/// Kind of network/security probe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProbeKind {
    /// Address, NS, MX and TXT records
    Dns,
    /// Response header snapshot and security header analysis
    HttpHeaders,
    /// Hosting provider, ASN and location
    Geo,
    /// Leaf certificate and negotiated protocol
    TlsCertificate,
    /// `/.well-known/security.txt`
    SecurityTxt,
    /// Third-party SSL grade
    SslGrade,
    /// `/robots.txt`
    RobotsTxt,
}

impl ProbeKind {
    /// How long a successful result of this kind stays in the probe cache.
    pub fn ttl(&self) -> Duration {
        match self {
            ProbeKind::SslGrade => SSL_GRADE_TTL,
            ProbeKind::TlsCertificate => TLS_CERTIFICATE_TTL,
            ProbeKind::Geo => GEO_TTL,
            ProbeKind::Dns => DNS_TTL,
            ProbeKind::HttpHeaders => HTTP_HEADERS_TTL,
            ProbeKind::SecurityTxt | ProbeKind::RobotsTxt => WELL_KNOWN_TTL,
        }
    }
}

/// Output of one successful probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Probe kind
    pub kind: ProbeKind,
    /// Probe-specific JSON payload
    pub payload: serde_json::Value,
    /// When the probe actually ran (a cache hit keeps the original time)
    pub fetched_at: DateTime<Utc>,
    /// Cache lifetime of this result
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl ProbeResult {
    /// Wraps a fresh payload, stamping the current time and the kind's TTL.
    pub fn new(kind: ProbeKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            fetched_at: Utc::now(),
            ttl: kind.ttl(),
        }
    }
}

/// A single network/security probe.
///
/// Implementations return a JSON payload on success. Returning
/// [`ProbeError::Unreachable`] aborts the whole mission; any other error only
/// drops this probe's result.
#[async_trait]
pub trait Probe: Send + Sync {
    /// The kind of result this probe produces.
    fn kind(&self) -> ProbeKind;

    /// Runs the probe against `target`.
    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError>;
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_ttls() {
        assert_eq!(ProbeKind::SslGrade.ttl(), Duration::from_secs(86_400));
        assert_eq!(ProbeKind::TlsCertificate.ttl(), Duration::from_secs(21_600));
        assert_eq!(ProbeKind::Geo.ttl(), Duration::from_secs(86_400));
        assert_eq!(ProbeKind::Dns.ttl(), Duration::from_secs(3_600));
        assert_eq!(ProbeKind::HttpHeaders.ttl(), Duration::from_secs(900));
        assert_eq!(ProbeKind::SecurityTxt.ttl(), ProbeKind::RobotsTxt.ttl());
    }

    #[test]
    fn test_kind_serialization_matches_display() {
        for kind in ProbeKind::iter() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
        assert_eq!(ProbeKind::HttpHeaders.to_string(), "http_headers");
    }

    #[test]
    fn test_result_serializes_ttl_in_seconds() {
        let result = ProbeResult::new(ProbeKind::Dns, serde_json::json!({"addresses": []}));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "dns");
        assert_eq!(json["ttl"], 3600);
        let back: ProbeResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
