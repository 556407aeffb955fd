//! TLS certificate probe.
//!
//! Connects to the target's TLS port and records the negotiated protocol and
//! cipher suite and the leaf certificate's subject, issuer, validity window,
//! key algorithm and DNS SANs.
//!
//! Uses `tokio-rustls` for the handshake and `x509-parser` for certificate parsing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::pki_types::ServerName;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{GeneralName, ParsedExtension};

use crate::config::{TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};
use crate::error_handling::ProbeError;

use super::security::analyze_certificate;
use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

/// Records the target's TLS certificate.
#[derive(Default)]
pub struct TlsProbe;

impl TlsProbe {
    /// Creates a TLS certificate probe.
    pub fn new() -> Self {
        Self
    }
}

fn client_config() -> Result<ClientConfig, ProbeError> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| ProbeError::Other(format!("TLS configuration error: {e}")))?
    .with_root_certificates(root_store)
    .with_no_client_auth();
    Ok(config)
}

/// Maps the subject public key algorithm OID to a name.
fn key_algorithm(cert: &X509Certificate<'_>) -> String {
    let oid = cert
        .tbs_certificate
        .subject_pki
        .algorithm
        .algorithm
        .to_id_string();
    match oid.as_str() {
        "1.2.840.113549.1.1.1" => "RSA".to_string(),
        "1.2.840.10045.2.1" => "ECDSA".to_string(),
        "1.3.101.112" => "Ed25519".to_string(),
        "1.3.101.113" => "Ed448".to_string(),
        _ => oid,
    }
}

/// Extracts DNS names from the Subject Alternative Name extension.
fn certificate_sans(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut sans = Vec::new();
    for ext in cert.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
            for general_name in &san.general_names {
                if let GeneralName::DNSName(dns_name) = general_name {
                    sans.push(dns_name.to_string());
                }
            }
        }
    }
    sans
}

fn to_utc(time: x509_parser::time::ASN1Time) -> Result<DateTime<Utc>, ProbeError> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| ProbeError::Upstream("certificate validity out of range".to_string()))
}

#[async_trait]
impl Probe for TlsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::TlsCertificate
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        let host = target.host.clone();
        let port = target.tls_port();
        log::debug!("Attempting TLS handshake with {host}:{port}");

        let server_name = ServerName::try_from(host.clone())
            .map_err(|e| ProbeError::Other(format!("Invalid server name {host}: {e}")))?;

        let sock = match tokio::time::timeout(
            Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        {
            Ok(Ok(sock)) => sock,
            Ok(Err(e)) => {
                return Err(ProbeError::Other(format!(
                    "Failed to connect to {host}:{port}: {e}"
                )))
            }
            Err(_) => {
                return Err(ProbeError::Timeout(format!(
                    "TCP connection to {host}:{port} ({TCP_CONNECT_TIMEOUT_SECS}s)"
                )))
            }
        };

        let connector = TlsConnector::from(Arc::new(client_config()?));
        let tls_stream = match tokio::time::timeout(
            Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
            connector.connect(server_name, sock),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProbeError::Other(format!(
                    "TLS handshake with {host} failed: {e}"
                )))
            }
            Err(_) => {
                return Err(ProbeError::Timeout(format!(
                    "TLS handshake with {host} ({TLS_HANDSHAKE_TIMEOUT_SECS}s)"
                )))
            }
        };

        let connection = tls_stream.get_ref().1;
        let protocol = connection
            .protocol_version()
            .map(|v| format!("{v:?}"))
            .unwrap_or_else(|| "Unknown".to_string());
        let cipher_suite = connection
            .negotiated_cipher_suite()
            .map(|cs| format!("{:?}", cs.suite()));

        let leaf = connection
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or_else(|| ProbeError::Upstream(format!("{host} presented no certificate")))?;
        let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
            .map_err(|e| ProbeError::Upstream(format!("Unparseable certificate: {e}")))?;

        let subject = cert.tbs_certificate.subject.to_string();
        let issuer = cert.tbs_certificate.issuer.to_string();
        let valid_from = to_utc(cert.tbs_certificate.validity.not_before)?;
        let valid_to = to_utc(cert.tbs_certificate.validity.not_after)?;
        let now = Utc::now();
        let warnings = analyze_certificate(&protocol, &subject, &issuer, valid_to, now);

        log::info!("TLS certificate extracted for {host} ({protocol}, issuer {issuer})");

        Ok(json!({
            "protocol": protocol,
            "cipher_suite": cipher_suite,
            "subject": subject,
            "issuer": issuer,
            "valid_from": valid_from.to_rfc3339(),
            "valid_to": valid_to.to_rfc3339(),
            "days_remaining": (valid_to - now).num_days(),
            "key_algorithm": key_algorithm(&cert),
            "sans": certificate_sans(&cert),
            "warnings": warnings,
        }))
    }
}
