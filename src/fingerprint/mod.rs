//! Evidence-based technology fingerprinting.
//!
//! This module establishes the "ground truth" for a mission: technologies
//! confirmed by matching page content against a static rule set, plus
//! technologies identified by response header heuristics.
//!
//! - Content rules are evaluated in order; the first matching pattern of a rule
//!   records the technology, and its version pattern is tried against the same
//!   content.
//! - Header heuristics only fill gaps: a name already confirmed by content is
//!   never re-added from headers.
//! - Detection is a pure function of its inputs.

mod headers;
mod models;
mod rules;

use std::collections::HashMap;

pub use models::{FingerprintRule, TechCategory, TechSignature};

use crate::config::MAX_EVIDENCE_SNIPPET_CHARS;
use rules::RULES;

/// Detects technologies from page content and response headers.
///
/// # Arguments
///
/// * `content` - Page body (HTML and inline scripts); `None` or empty skips content rules
/// * `headers` - Response headers; `None` skips header heuristics. Keys are
///   matched case-insensitively.
///
/// # Returns
///
/// Signatures with unique names: content-derived first (in rule order), then
/// header-derived (in heuristic order).
pub fn detect(
    content: Option<&str>,
    headers: Option<&HashMap<String, String>>,
) -> Vec<TechSignature> {
    let mut signatures = match content {
        Some(content) if !content.is_empty() => detect_content(content),
        _ => Vec::new(),
    };

    if let Some(headers) = headers {
        let from_headers = headers::check_headers(headers, &signatures);
        signatures.extend(from_headers);
    }

    log::debug!(
        "Fingerprint matcher confirmed {} technolog{}",
        signatures.len(),
        if signatures.len() == 1 { "y" } else { "ies" }
    );
    signatures
}

fn detect_content(content: &str) -> Vec<TechSignature> {
    let mut signatures: Vec<TechSignature> = Vec::new();

    for rule in RULES.iter() {
        if signatures.iter().any(|s| s.name == rule.name) {
            continue;
        }
        let Some(matched) = rule
            .content_patterns
            .iter()
            .find_map(|pattern| pattern.find(content))
        else {
            continue;
        };

        let version = rule.version_pattern.as_ref().and_then(|re| {
            re.captures(content).and_then(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str())
                    .find(|v| !v.is_empty())
                    .map(str::to_string)
            })
        });

        log::debug!(
            "Technology matched via content: {} ({:?})",
            rule.name,
            matched.as_str()
        );
        signatures.push(TechSignature {
            name: rule.name.to_string(),
            category: rule.category,
            version,
            evidence: format!("content: \"{}\"", snippet(matched.as_str())),
        });
    }

    signatures
}

/// Truncates a matched string to the evidence snippet limit on a char boundary.
fn snippet(matched: &str) -> &str {
    match matched.char_indices().nth(MAX_EVIDENCE_SNIPPET_CHARS) {
        Some((idx, _)) => &matched[..idx],
        None => matched,
    }
}
