//! Hosting and location probe (ip-api.com JSON API).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error_handling::{categorize_probe_error, ProbeError};

use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

const GEO_FIELDS: &str = "status,message,country,countryCode,regionName,city,isp,org,as,query";

/// Looks up the hosting provider, ASN and location of the target host.
pub struct GeoProbe {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    org: Option<String>,
    #[serde(default, rename = "as")]
    asn: Option<String>,
    #[serde(default)]
    query: Option<String>,
}

impl GeoProbe {
    /// Creates a probe against the lookup API at `base_url`.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn summarize(response: GeoResponse) -> Result<serde_json::Value, ProbeError> {
    if response.status != "success" {
        return Err(ProbeError::Upstream(
            response
                .message
                .unwrap_or_else(|| format!("lookup status {}", response.status)),
        ));
    }
    Ok(json!({
        "ip": response.query,
        "country": response.country,
        "country_code": response.country_code,
        "region": response.region_name,
        "city": response.city,
        "isp": response.isp,
        "org": response.org,
        "asn": response.asn,
    }))
}

#[async_trait]
impl Probe for GeoProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Geo
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        // The API accepts a host name and resolves it itself.
        let url = format!("{}/{}", self.base_url, target.host);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", GEO_FIELDS)])
            .send()
            .await
            .map_err(|e| categorize_probe_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| ProbeError::Upstream(format!("malformed geo response: {e}")))?;
        summarize(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_maps_fields() {
        let response: GeoResponse = serde_json::from_value(json!({
            "status": "success",
            "country": "United States",
            "countryCode": "US",
            "regionName": "Virginia",
            "city": "Ashburn",
            "isp": "Amazon.com, Inc.",
            "org": "AWS EC2 (us-east-1)",
            "as": "AS14618 Amazon.com, Inc.",
            "query": "192.0.2.10"
        }))
        .unwrap();
        let value = summarize(response).unwrap();
        assert_eq!(value["ip"], "192.0.2.10");
        assert_eq!(value["asn"], "AS14618 Amazon.com, Inc.");
        assert_eq!(value["region"], "Virginia");
    }

    #[test]
    fn test_fail_status_is_upstream_error() {
        let response: GeoResponse = serde_json::from_value(json!({
            "status": "fail",
            "message": "invalid query"
        }))
        .unwrap();
        assert_eq!(
            summarize(response).unwrap_err(),
            ProbeError::Upstream("invalid query".to_string())
        );
    }
}
