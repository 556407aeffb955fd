//! Security posture checks over probe snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{
    HEADER_CONTENT_SECURITY_POLICY, HEADER_STRICT_TRANSPORT_SECURITY,
    HEADER_X_CONTENT_TYPE_OPTIONS, HEADER_X_FRAME_OPTIONS, SECURITY_HEADERS,
};

/// Types of security warnings that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityWarning {
    /// Site uses HTTP instead of HTTPS
    NoHttps,
    /// TLS version is too old (< TLS 1.2)
    WeakTls,
    /// Missing Strict-Transport-Security (HSTS) header
    MissingHsts,
    /// Missing Content-Security-Policy header
    MissingCsp,
    /// Missing X-Content-Type-Options header
    MissingContentTypeOptions,
    /// Missing X-Frame-Options header
    MissingFrameOptions,
    /// Certificate is expired or self-signed
    InvalidCertificate,
    /// Certificate expires within 14 days
    CertificateExpiringSoon,
}

impl SecurityWarning {
    /// Returns a human-readable description of the warning
    pub fn description(&self) -> &'static str {
        match self {
            SecurityWarning::NoHttps => "Site uses HTTP instead of HTTPS",
            SecurityWarning::WeakTls => "TLS version is too old (< TLS 1.2)",
            SecurityWarning::MissingHsts => "Missing Strict-Transport-Security (HSTS) header",
            SecurityWarning::MissingCsp => "Missing Content-Security-Policy header",
            SecurityWarning::MissingContentTypeOptions => "Missing X-Content-Type-Options header",
            SecurityWarning::MissingFrameOptions => "Missing X-Frame-Options header",
            SecurityWarning::InvalidCertificate => "Certificate is expired or self-signed",
            SecurityWarning::CertificateExpiringSoon => "Certificate expires within 14 days",
        }
    }

    /// Returns a short code for the warning
    pub fn code(&self) -> &'static str {
        match self {
            SecurityWarning::NoHttps => "no_https",
            SecurityWarning::WeakTls => "weak_tls",
            SecurityWarning::MissingHsts => "missing_hsts",
            SecurityWarning::MissingCsp => "missing_csp",
            SecurityWarning::MissingContentTypeOptions => "missing_content_type_options",
            SecurityWarning::MissingFrameOptions => "missing_frame_options",
            SecurityWarning::InvalidCertificate => "invalid_certificate",
            SecurityWarning::CertificateExpiringSoon => "certificate_expiring_soon",
        }
    }
}

impl Serialize for SecurityWarning {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = s.serialize_struct("SecurityWarning", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("description", self.description())?;
        state.end()
    }
}

const CERT_EXPIRY_WARNING_DAYS: i64 = 14;

/// Checks if a TLS version is considered weak (< TLS 1.2)
///
/// # Arguments
///
/// * `version` - TLS version string (e.g., "TLSv1_2", "TLSv1.3", "SSLv3")
pub(crate) fn is_weak_tls(version: &str) -> bool {
    let version_normalized = version
        .to_lowercase()
        .replace(' ', "")
        .replace('_', ".")
        .replace("tlsv", "tls");

    !(version_normalized.contains("tls1.3") || version_normalized.contains("tls1.2"))
}

/// Analyzes a response header snapshot.
///
/// # Arguments
///
/// * `is_https` - Whether the final response was served over TLS
/// * `headers` - Response headers (keys compared case-insensitively)
///
/// # Returns
///
/// Warnings in a stable order. A plain-HTTP target only yields `NoHttps`,
/// since transport headers are meaningless without TLS.
pub(crate) fn analyze_headers(
    is_https: bool,
    headers: &HashMap<String, String>,
) -> Vec<SecurityWarning> {
    if !is_https {
        return vec![SecurityWarning::NoHttps];
    }

    let has = |name: &str| headers.keys().any(|k| k.eq_ignore_ascii_case(name));
    [
        (HEADER_STRICT_TRANSPORT_SECURITY, SecurityWarning::MissingHsts),
        (HEADER_CONTENT_SECURITY_POLICY, SecurityWarning::MissingCsp),
        (
            HEADER_X_CONTENT_TYPE_OPTIONS,
            SecurityWarning::MissingContentTypeOptions,
        ),
        (HEADER_X_FRAME_OPTIONS, SecurityWarning::MissingFrameOptions),
    ]
    .into_iter()
    .filter(|(header, _)| !has(header))
    .map(|(_, warning)| warning)
    .collect()
}

/// Splits the known security headers into present (with values) and missing.
pub(crate) fn security_header_presence(
    headers: &HashMap<String, String>,
) -> (HashMap<String, String>, Vec<String>) {
    let mut present = HashMap::new();
    let mut missing = Vec::new();
    for name in SECURITY_HEADERS {
        match headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, value)) => {
                present.insert(name.to_lowercase(), value.clone());
            }
            None => missing.push(name.to_lowercase()),
        }
    }
    (present, missing)
}

/// Checks a leaf certificate and negotiated protocol.
///
/// # Arguments
///
/// * `protocol` - Negotiated protocol version
/// * `subject` / `issuer` - Distinguished names of the leaf certificate
/// * `valid_to` - Expiry of the leaf certificate
/// * `now` - Reference time
pub(crate) fn analyze_certificate(
    protocol: &str,
    subject: &str,
    issuer: &str,
    valid_to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<SecurityWarning> {
    let mut warnings = Vec::new();

    if is_weak_tls(protocol) {
        warnings.push(SecurityWarning::WeakTls);
    }

    let is_expired = valid_to < now;
    let is_self_signed = subject.trim().eq_ignore_ascii_case(issuer.trim());
    if is_expired || is_self_signed {
        warnings.push(SecurityWarning::InvalidCertificate);
    } else if (valid_to - now).num_days() < CERT_EXPIRY_WARNING_DAYS {
        warnings.push(SecurityWarning::CertificateExpiringSoon);
    }

    warnings
}
