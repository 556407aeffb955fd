//! Data structures for technology fingerprinting.
//!
//! - `TechCategory`: the coarse category a technology belongs to
//! - `TechSignature`: a confirmed technology with the evidence that confirmed it
//! - `FingerprintRule`: a compiled content-matching rule

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Category of a detected technology.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum TechCategory {
    /// Client-side frameworks and build tooling
    Frontend,
    /// Server-side frameworks, languages and CMSs
    Backend,
    /// Client-side libraries
    Library,
    /// Web servers, CDNs and hosting platforms
    Server,
    /// Hosted databases and backend-as-a-service
    Database,
}

/// A technology confirmed by a content pattern or a header heuristic.
///
/// `evidence` always names the matched content or header, which is what makes
/// a signature "ground truth" for the analysis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechSignature {
    /// Technology name; unique within one detection result
    pub name: String,
    /// Technology category
    pub category: TechCategory,
    /// Version, when a version pattern or header value provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// What matched (content snippet or `Header: value`)
    pub evidence: String,
}

/// A compiled content-matching rule.
#[derive(Debug, Clone)]
pub struct FingerprintRule {
    /// Technology name
    pub name: &'static str,
    /// Technology category
    pub category: TechCategory,
    /// Patterns tried in order against the page content; the first match wins
    pub content_patterns: Vec<Regex>,
    /// Optional version pattern; the first non-empty capture group is the version
    pub version_pattern: Option<Regex>,
}
