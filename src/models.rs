//! Shared domain types.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::config::DEEP_THINKING_BUDGET;
use crate::probe::ProbeKind;

/// Breadth of a mission.
///
/// Controls which probes run and whether the analysis call gets a reasoning
/// budget.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ScanLevel {
    /// Reduced probe set, no reasoning budget
    Fast,
    /// Default probe set, no reasoning budget
    Standard,
    /// Full probe set and an elevated reasoning budget
    Deep,
}

/// Estimate shown to the user before a mission starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelEstimate {
    /// Approximate tokens consumed by the analysis call
    pub tokens: u32,
    /// Approximate wall-clock duration in seconds
    pub seconds: u32,
}

impl ScanLevel {
    /// Probes this level runs, in dispatch order.
    pub fn probe_kinds(&self) -> &'static [ProbeKind] {
        const FAST: &[ProbeKind] = &[ProbeKind::Dns, ProbeKind::HttpHeaders, ProbeKind::Geo];
        const STANDARD: &[ProbeKind] = &[
            ProbeKind::Dns,
            ProbeKind::HttpHeaders,
            ProbeKind::Geo,
            ProbeKind::TlsCertificate,
            ProbeKind::SecurityTxt,
        ];
        const DEEP: &[ProbeKind] = &[
            ProbeKind::Dns,
            ProbeKind::HttpHeaders,
            ProbeKind::Geo,
            ProbeKind::TlsCertificate,
            ProbeKind::SecurityTxt,
            ProbeKind::SslGrade,
            ProbeKind::RobotsTxt,
        ];
        match self {
            ScanLevel::Fast => FAST,
            ScanLevel::Standard => STANDARD,
            ScanLevel::Deep => DEEP,
        }
    }

    /// Thinking budget attached to the analysis request (`None` omits it).
    pub fn thinking_budget(&self) -> Option<u32> {
        match self {
            ScanLevel::Deep => Some(DEEP_THINKING_BUDGET),
            ScanLevel::Fast | ScanLevel::Standard => None,
        }
    }

    /// UI-only estimate of cost and duration.
    pub fn estimate(&self) -> LevelEstimate {
        match self {
            ScanLevel::Fast => LevelEstimate {
                tokens: 4_000,
                seconds: 15,
            },
            ScanLevel::Standard => LevelEstimate {
                tokens: 8_000,
                seconds: 30,
            },
            ScanLevel::Deep => LevelEstimate {
                tokens: 8_000 + DEEP_THINKING_BUDGET,
                seconds: 90,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_probe_sets_grow_with_level() {
        let fast = ScanLevel::Fast.probe_kinds();
        let standard = ScanLevel::Standard.probe_kinds();
        let deep = ScanLevel::Deep.probe_kinds();
        assert!(fast.len() < standard.len());
        assert!(standard.len() < deep.len());
        assert!(fast.iter().all(|k| standard.contains(k)));
        assert!(standard.iter().all(|k| deep.contains(k)));
    }

    #[test]
    fn test_only_deep_has_thinking_budget() {
        assert_eq!(ScanLevel::Fast.thinking_budget(), None);
        assert_eq!(ScanLevel::Standard.thinking_budget(), None);
        assert_eq!(ScanLevel::Deep.thinking_budget(), Some(32_768));
    }

    #[test]
    fn test_level_serialization() {
        for level in ScanLevel::iter() {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level));
        }
        assert_eq!(ScanLevel::Deep.to_string(), "DEEP");
    }

    #[test]
    fn test_estimates_increase() {
        assert!(ScanLevel::Fast.estimate().seconds < ScanLevel::Deep.estimate().seconds);
        assert!(ScanLevel::Standard.estimate().tokens < ScanLevel::Deep.estimate().tokens);
    }
}
