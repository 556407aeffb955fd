//! Response header snapshot probe.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::error_handling::{categorize_probe_error, ProbeError};

use super::security::{analyze_headers, security_header_presence};
use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

/// Requests the target and records its response headers and security header
/// posture.
pub struct HeadersProbe {
    client: reqwest::Client,
}

impl HeadersProbe {
    /// Creates a header probe using `client` (redirects are followed by the client).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Converts a reqwest header map into lowercase-keyed strings.
///
/// Repeated headers are joined with `, `; non-UTF-8 values are skipped.
pub(crate) fn header_map_to_strings(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}

#[async_trait]
impl Probe for HeadersProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::HttpHeaders
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        let response = self
            .client
            .get(target.url.clone())
            .send()
            .await
            .map_err(|e| categorize_probe_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let headers = header_map_to_strings(response.headers());
        let is_https = final_url.scheme() == "https";
        let (present, missing) = security_header_presence(&headers);
        let warnings = analyze_headers(is_https, &headers);

        log::debug!(
            "Header probe for {}: {} header(s), {} warning(s)",
            target.host,
            headers.len(),
            warnings.len()
        );

        Ok(json!({
            "status": status.as_u16(),
            "final_url": final_url.as_str(),
            "https": is_https,
            "headers": headers,
            "security_headers": {
                "present": present,
                "missing": missing,
            },
            "warnings": warnings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_header_map_to_strings_lowercases_and_joins() {
        let mut headers = HeaderMap::new();
        headers.insert("Server", HeaderValue::from_static("nginx"));
        headers.append("Set-Cookie", HeaderValue::from_static("a=1"));
        headers.append("Set-Cookie", HeaderValue::from_static("b=2"));

        let map = header_map_to_strings(&headers);
        assert_eq!(map.get("server").map(String::as_str), Some("nginx"));
        assert_eq!(map.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }
}
