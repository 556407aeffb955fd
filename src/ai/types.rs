//! Analysis request, response and usage types.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::models::ScanLevel;

/// Severity of an analysis finding.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Info,
}

/// One finding returned by the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Severity,
}

/// Unrecognized severities degrade to `info` instead of failing the parse.
fn lenient_severity<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Severity, D::Error> {
    let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
    Ok(match raw.trim().to_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" | "moderate" => Severity::Medium,
        "low" => Severity::Low,
        _ => Severity::Info,
    })
}

/// Structured output of the analysis call.
///
/// Any other field the model returns (such as a technology list) is ignored;
/// technologies come only from the fingerprint matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Mission context passed alongside the evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisContext {
    /// Normalized target URL
    pub target_url: String,
    /// Scan level (drives the reasoning budget)
    pub level: ScanLevel,
    /// Locale the findings should be written in (e.g. `en`, `de`)
    pub language: String,
    /// Page title, when the page fetch found one
    pub page_title: Option<String>,
}

/// Provider-neutral request built from the evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// `None` leaves the reasoning budget to the provider default
    pub thinking_budget: Option<u32>,
}

/// Token counts for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub thinking_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens + self.thinking_tokens
    }
}

/// Raw provider answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Model output text (expected to be JSON)
    pub text: String,
    /// Token counts as reported by the provider, if any
    pub usage: Option<TokenUsage>,
}

/// Usage accounting for one mission's analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(flatten)]
    pub tokens: TokenUsage,
    pub total_tokens: u64,
    /// True when token counts were estimated from text length
    pub estimated: bool,
    /// Attempts made, the successful one included
    pub attempts: u32,
    /// Wall-clock time of the analysis stage, gate waits and backoff included
    pub elapsed_ms: u64,
}

/// Successful analysis plus its usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub analysis: AnalysisResult,
    pub usage: Usage,
}
