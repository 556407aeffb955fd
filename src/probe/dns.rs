//! DNS probe.
//!
//! Resolves the target's addresses and collects NS, MX and TXT records
//! (with SPF and DMARC extracted). An address lookup that proves the host
//! does not exist is the one fatal probe outcome of a mission.

use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use serde_json::json;

use crate::error_handling::ProbeError;

use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

/// Resolves addresses and mail/name-server records for the target host.
pub struct DnsProbe {
    resolver: Arc<TokioAsyncResolver>,
}

impl DnsProbe {
    /// Creates a DNS probe backed by `resolver`.
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        Self { resolver }
    }

    async fn lookup_addresses(&self, host: &str) -> Result<Vec<String>, ProbeError> {
        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| classify_address_error(host, &e))?;
        let addresses: Vec<String> = response.iter().map(|ip| ip.to_string()).collect();
        if addresses.is_empty() {
            return Err(ProbeError::Unreachable(format!("{host} has no addresses")));
        }
        Ok(addresses)
    }

    /// Record lookups are best effort: a missing record set or a failed
    /// query yields an empty list.
    async fn lookup_records(&self, name: &str, record_type: RecordType) -> Vec<RData> {
        match self.resolver.lookup(name, record_type).await {
            Ok(lookup) => lookup.iter().cloned().collect(),
            Err(e) => {
                if !matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    log::warn!("{record_type} record lookup failed for {name}: {e}");
                }
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Probe for DnsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Dns
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        let host = target.host.as_str();
        let addresses = self.lookup_addresses(host).await?;

        // IP literals have no zone to query.
        if host.parse::<std::net::IpAddr>().is_ok() {
            return Ok(json!({ "addresses": addresses }));
        }

        let dmarc_name = format!("_dmarc.{host}");
        let (ns, mx, txt, dmarc_txt) = tokio::join!(
            self.lookup_records(host, RecordType::NS),
            self.lookup_records(host, RecordType::MX),
            self.lookup_records(host, RecordType::TXT),
            self.lookup_records(&dmarc_name, RecordType::TXT),
        );

        let nameservers: Vec<String> = ns
            .iter()
            .filter_map(|rdata| match rdata {
                RData::NS(ns) => Some(ns.to_utf8()),
                _ => None,
            })
            .collect();

        let mut mail_exchangers: Vec<(u16, String)> = mx
            .iter()
            .filter_map(|rdata| match rdata {
                RData::MX(mx) => Some((mx.preference(), mx.exchange().to_utf8())),
                _ => None,
            })
            .collect();
        mail_exchangers.sort_by_key(|(priority, _)| *priority);

        let txt_records = txt_strings(&txt);
        let dmarc_records = txt_strings(&dmarc_txt);

        log::debug!(
            "DNS probe for {host}: {} address(es), {} NS, {} MX, {} TXT",
            addresses.len(),
            nameservers.len(),
            mail_exchangers.len(),
            txt_records.len()
        );

        Ok(json!({
            "addresses": addresses,
            "nameservers": nameservers,
            "mx": mail_exchangers
                .iter()
                .map(|(priority, exchange)| json!({ "priority": priority, "exchange": exchange }))
                .collect::<Vec<_>>(),
            "spf": extract_spf_record(&txt_records),
            "dmarc": extract_dmarc_record(&dmarc_records),
            "txt": txt_records,
        }))
    }
}

fn classify_address_error(host: &str, error: &ResolveError) -> ProbeError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            ProbeError::Unreachable(format!("{host}: {response_code}"))
        }
        ResolveErrorKind::Timeout => ProbeError::Timeout(format!("DNS lookup for {host}")),
        _ => ProbeError::Other(format!("DNS lookup for {host} failed: {error}")),
    }
}

/// TXT records can contain multiple strings; they are joined per record.
fn txt_strings(records: &[RData]) -> Vec<String> {
    records
        .iter()
        .filter_map(|rdata| match rdata {
            RData::TXT(txt) => Some(
                txt.iter()
                    .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                    .collect::<Vec<String>>()
                    .join(""),
            ),
            _ => None,
        })
        .collect()
}

/// Extracts the SPF record (`v=spf1 ...`) from TXT records.
pub(crate) fn extract_spf_record(txt_records: &[String]) -> Option<String> {
    txt_records
        .iter()
        .find(|txt| txt.trim().starts_with("v=spf1"))
        .map(|s| s.trim().to_string())
}

/// Extracts the DMARC record (`v=DMARC1; ...`) from `_dmarc` TXT records.
pub(crate) fn extract_dmarc_record(txt_records: &[String]) -> Option<String> {
    txt_records
        .iter()
        .find(|txt| txt.trim().starts_with("v=DMARC1"))
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::rdata::TXT;

    #[test]
    fn test_extract_spf_record() {
        let records = vec![
            "google-site-verification=abc".to_string(),
            "  v=spf1 include:_spf.google.com ~all ".to_string(),
        ];
        assert_eq!(
            extract_spf_record(&records).as_deref(),
            Some("v=spf1 include:_spf.google.com ~all")
        );
        assert_eq!(extract_spf_record(&[]), None);
    }

    #[test]
    fn test_extract_dmarc_record() {
        let records = vec!["v=DMARC1; p=reject; rua=mailto:d@example.com".to_string()];
        assert_eq!(
            extract_dmarc_record(&records).as_deref(),
            Some("v=DMARC1; p=reject; rua=mailto:d@example.com")
        );
        assert_eq!(extract_dmarc_record(&["v=spf1 -all".to_string()]), None);
    }

    #[test]
    fn test_txt_strings_join_segments() {
        let records = vec![RData::TXT(TXT::new(vec![
            "v=spf1 ".to_string(),
            "-all".to_string(),
        ]))];
        assert_eq!(txt_strings(&records), vec!["v=spf1 -all".to_string()]);
    }

    #[tokio::test]
    async fn test_ip_literal_skips_zone_records() {
        let resolver = crate::initialization::init_resolver().unwrap();
        let target = ProbeTarget::parse("http://127.0.0.1:8080").unwrap();
        let payload = DnsProbe::new(resolver).run(&target).await.unwrap();
        assert_eq!(payload, json!({ "addresses": ["127.0.0.1"] }));
    }

    #[test]
    fn test_timeout_is_transient() {
        let error = ResolveError::from(ResolveErrorKind::Timeout);
        let classified = classify_address_error("example.com", &error);
        assert!(matches!(classified, ProbeError::Timeout(_)));
        assert!(!classified.is_fatal());
    }
}
