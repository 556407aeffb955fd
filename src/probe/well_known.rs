//! `security.txt` and `robots.txt` probes.

use async_trait::async_trait;
use serde_json::json;

use crate::config::{HTTP_STATUS_NOT_FOUND, MAX_WELL_KNOWN_BODY_CHARS};
use crate::error_handling::{categorize_probe_error, ProbeError};

use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

/// Fetches a well-known file from the target's origin.
///
/// A 404 is a successful observation (`present: false`), not a failure.
pub struct WellKnownProbe {
    client: reqwest::Client,
    kind: ProbeKind,
    path: &'static str,
}

impl WellKnownProbe {
    /// Probe for `/.well-known/security.txt`.
    pub fn security_txt(client: reqwest::Client) -> Self {
        Self {
            client,
            kind: ProbeKind::SecurityTxt,
            path: "/.well-known/security.txt",
        }
    }

    /// Probe for `/robots.txt`.
    pub fn robots_txt(client: reqwest::Client) -> Self {
        Self {
            client,
            kind: ProbeKind::RobotsTxt,
            path: "/robots.txt",
        }
    }

    fn summarize(&self, body: &str) -> serde_json::Value {
        let content: String = body.chars().take(MAX_WELL_KNOWN_BODY_CHARS).collect();
        match self.kind {
            ProbeKind::SecurityTxt => json!({
                "present": true,
                "path": self.path,
                "contacts": directive_values(body, "Contact"),
                "expires": directive_values(body, "Expires").into_iter().next(),
                "policy": directive_values(body, "Policy").into_iter().next(),
                "content": content,
            }),
            _ => json!({
                "present": true,
                "path": self.path,
                "disallow": directive_values(body, "Disallow")
                    .into_iter()
                    .filter(|v| !v.is_empty())
                    .collect::<Vec<_>>(),
                "sitemaps": directive_values(body, "Sitemap"),
                "content": content,
            }),
        }
    }
}

/// Values of `Name: value` lines (name compared case-insensitively, comments skipped).
fn directive_values(body: &str, name: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
        .collect()
}

#[async_trait]
impl Probe for WellKnownProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        let url = format!("{}{}", target.origin(), self.path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| categorize_probe_error(&e))?;

        let status = response.status();
        if status.as_u16() == HTTP_STATUS_NOT_FOUND {
            return Ok(json!({ "present": false, "path": self.path }));
        }
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| categorize_probe_error(&e))?;
        Ok(self.summarize(&body))
    }
}
