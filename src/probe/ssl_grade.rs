//! Third-party SSL grade probe (SSL Labs assessment API).
//!
//! Only cached assessments are requested (`fromCache=on`); a fresh assessment
//! takes minutes, so an assessment that is still running is reported as an
//! upstream error and the probe result stays absent.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error_handling::{categorize_probe_error, ProbeError};

use super::target::ProbeTarget;
use super::types::{Probe, ProbeKind};

/// Maximum age (hours) of a cached assessment accepted from the API.
const MAX_ASSESSMENT_AGE_HOURS: u32 = 24;

/// Fetches the SSL Labs grade for the target host.
pub struct SslGradeProbe {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assessment {
    status: String,
    #[serde(default)]
    status_message: Option<String>,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Endpoint {
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    has_warnings: bool,
}

impl SslGradeProbe {
    /// Creates a probe against the assessment API at `base_url`.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Orders grades from best to worst; unknown grades sort last.
fn grade_rank(grade: &str) -> u8 {
    match grade {
        "A+" => 0,
        "A" => 1,
        "A-" => 2,
        "B" => 3,
        "C" => 4,
        "D" => 5,
        "E" => 6,
        "F" => 7,
        "T" => 8,
        "M" => 9,
        _ => 10,
    }
}

fn summarize(assessment: Assessment) -> Result<serde_json::Value, ProbeError> {
    match assessment.status.as_str() {
        "READY" => {}
        "ERROR" => {
            return Err(ProbeError::Upstream(
                assessment
                    .status_message
                    .unwrap_or_else(|| "assessment failed".to_string()),
            ))
        }
        other => {
            return Err(ProbeError::Upstream(format!(
                "assessment not ready ({other})"
            )))
        }
    }

    // The headline grade is the worst endpoint grade.
    let grade = assessment
        .endpoints
        .iter()
        .filter_map(|e| e.grade.as_deref())
        .max_by_key(|g| grade_rank(g))
        .map(str::to_string);

    Ok(json!({
        "grade": grade,
        "endpoints": assessment
            .endpoints
            .iter()
            .map(|e| json!({
                "ip": e.ip_address,
                "grade": e.grade,
                "has_warnings": e.has_warnings,
            }))
            .collect::<Vec<_>>(),
    }))
}

#[async_trait]
impl Probe for SslGradeProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::SslGrade
    }

    async fn run(&self, target: &ProbeTarget) -> Result<serde_json::Value, ProbeError> {
        let url = format!("{}/analyze", self.base_url);
        let max_age = MAX_ASSESSMENT_AGE_HOURS.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("host", target.host.as_str()),
                ("fromCache", "on"),
                ("maxAge", max_age.as_str()),
                ("all", "done"),
            ])
            .send()
            .await
            .map_err(|e| categorize_probe_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let assessment: Assessment = response
            .json()
            .await
            .map_err(|e| ProbeError::Upstream(format!("malformed assessment: {e}")))?;
        summarize(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(json: serde_json::Value) -> Assessment {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_ready_assessment_reports_worst_grade() {
        let value = summarize(assessment(json!({
            "status": "READY",
            "endpoints": [
                {"ipAddress": "192.0.2.1", "grade": "A+", "hasWarnings": false},
                {"ipAddress": "192.0.2.2", "grade": "B", "hasWarnings": true}
            ]
        })))
        .unwrap();
        assert_eq!(value["grade"], "B");
        assert_eq!(value["endpoints"][1]["has_warnings"], true);
    }

    #[test]
    fn test_in_progress_is_transient() {
        let error = summarize(assessment(json!({"status": "IN_PROGRESS"}))).unwrap_err();
        assert!(matches!(error, ProbeError::Upstream(_)));
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_error_status_carries_message() {
        let error = summarize(assessment(json!({
            "status": "ERROR",
            "statusMessage": "Unable to resolve domain name"
        })))
        .unwrap_err();
        assert_eq!(
            error,
            ProbeError::Upstream("Unable to resolve domain name".to_string())
        );
    }
}
