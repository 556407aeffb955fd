//! Mission report assembly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ai::{AnalysisOutcome, Finding, Usage};
use crate::config::REPORT_SCHEMA_VERSION;
use crate::fingerprint::TechSignature;
use crate::models::ScanLevel;
use crate::probe::{ProbeFailure, ProbeKind, ProbeResult};

use super::page::PageSnapshot;

/// What is known about where and how the target is hosted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetIntelligence {
    pub ip: Option<String>,
    /// Hosting organization (falls back to the ISP)
    pub hosting: Option<String>,
    pub asn: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub page_title: Option<String>,
    pub generator: Option<String>,
    pub server: Option<String>,
}

fn payload_str(result: Option<&ProbeResult>, field: &str) -> Option<String> {
    result
        .and_then(|r| r.payload.get(field))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl TargetIntelligence {
    /// Derives intelligence from the probe results and the page snapshot.
    pub fn gather(probes: &[ProbeResult], page: Option<&PageSnapshot>) -> Self {
        let find = |kind: ProbeKind| probes.iter().find(|p| p.kind == kind);
        let geo = find(ProbeKind::Geo);
        let dns = find(ProbeKind::Dns);
        let headers = find(ProbeKind::HttpHeaders);

        let ip = payload_str(geo, "ip").or_else(|| {
            dns.and_then(|r| r.payload["addresses"].as_array())
                .and_then(|addresses| addresses.first())
                .and_then(|a| a.as_str())
                .map(str::to_string)
        });

        let server = page
            .and_then(|p| p.headers.get("server").cloned())
            .or_else(|| {
                headers
                    .and_then(|r| r.payload["headers"]["server"].as_str())
                    .map(str::to_string)
            });

        Self {
            ip,
            hosting: payload_str(geo, "org").or_else(|| payload_str(geo, "isp")),
            asn: payload_str(geo, "asn"),
            country: payload_str(geo, "country"),
            city: payload_str(geo, "city"),
            page_title: page.and_then(|p| p.title.clone()),
            generator: page.and_then(|p| p.generator.clone()),
            server,
        }
    }
}

/// A probe that produced no result, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedProbe {
    pub kind: ProbeKind,
    pub reason: String,
}

impl From<&ProbeFailure> for FailedProbe {
    fn from(failure: &ProbeFailure) -> Self {
        Self {
            kind: failure.kind,
            reason: failure.error.to_string(),
        }
    }
}

/// Final, immutable result of a successful mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionReport {
    /// Report schema version
    pub version: String,
    pub target_url: String,
    pub level: ScanLevel,
    pub language: String,
    /// Confirmed technologies; only the fingerprint matcher contributes here
    pub technologies: Vec<TechSignature>,
    pub probes: Vec<ProbeResult>,
    pub failed_probes: Vec<FailedProbe>,
    pub cached_probes: Vec<ProbeKind>,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub intelligence: TargetIntelligence,
    pub usage: Usage,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Inputs to [`MissionReport::assemble`].
pub struct ReportParts<'a> {
    pub target_url: &'a str,
    pub level: ScanLevel,
    pub language: &'a str,
    pub technologies: Vec<TechSignature>,
    pub probes: Vec<ProbeResult>,
    pub failures: &'a [ProbeFailure],
    pub cache_hits: &'a [ProbeKind],
    pub page: Option<&'a PageSnapshot>,
    pub analysis: AnalysisOutcome,
    pub started_at: DateTime<Utc>,
}

impl MissionReport {
    pub fn assemble(parts: ReportParts<'_>) -> Self {
        let intelligence = TargetIntelligence::gather(&parts.probes, parts.page);
        Self {
            version: REPORT_SCHEMA_VERSION.to_string(),
            target_url: parts.target_url.to_string(),
            level: parts.level,
            language: parts.language.to_string(),
            technologies: parts.technologies,
            probes: parts.probes,
            failed_probes: parts.failures.iter().map(FailedProbe::from).collect(),
            cached_probes: parts.cache_hits.to_vec(),
            summary: parts.analysis.analysis.summary,
            findings: parts.analysis.analysis.findings,
            recommendations: parts.analysis.analysis.recommendations,
            intelligence,
            usage: parts.analysis.usage,
            started_at: parts.started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
