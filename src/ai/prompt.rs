//! Prompt construction.
//!
//! The confirmed signatures are serialized verbatim into the request and
//! declared non-negotiable: the model may reason about them but not add to,
//! drop or rename them.

use serde_json::json;

use crate::fingerprint::TechSignature;
use crate::probe::ProbeResult;

use super::types::{AnalysisContext, AnalysisRequest};

const SYSTEM_PROMPT: &str = "You are a senior web security reconnaissance analyst. \
You receive confirmed technology signatures and raw probe data for one website. \
Assess the attack surface and security posture using only that evidence. \
The CONFIRMED TECHNOLOGIES list is ground truth established by deterministic matching: \
never contradict it, never remove entries and never claim technologies that are not on it. \
Do not speculate about versions that are not given. \
Respond with a single JSON object of the form \
{\"summary\": string, \"findings\": [{\"title\": string, \"description\": string, \
\"severity\": \"critical\"|\"high\"|\"medium\"|\"low\"|\"info\"}], \"recommendations\": [string]}.";

/// Builds the analysis request for one mission.
///
/// # Arguments
///
/// * `ground_truth` - Signatures confirmed by the fingerprint matcher
/// * `probes` - Probe results gathered for the target
/// * `context` - Target, scan level and output language
pub fn build_request(
    ground_truth: &[TechSignature],
    probes: &[ProbeResult],
    context: &AnalysisContext,
) -> AnalysisRequest {
    let signatures = serde_json::to_string_pretty(ground_truth).unwrap_or_else(|_| "[]".into());

    let snapshot: serde_json::Map<String, serde_json::Value> = probes
        .iter()
        .map(|p| (p.kind.to_string(), p.payload.clone()))
        .collect();
    let snapshot = serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".into());

    let page = json!({
        "url": context.target_url,
        "title": context.page_title,
        "scan_level": context.level,
    });

    let user_prompt = format!(
        "TARGET:\n{page}\n\n\
         CONFIRMED TECHNOLOGIES (ground truth, non-negotiable):\n{signatures}\n\n\
         PROBE DATA:\n{snapshot}\n\n\
         Write every human-readable string in the language with code \"{language}\".",
        language = context.language,
    );

    AnalysisRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
        thinking_budget: context.level.thinking_budget(),
    }
}
