//! Observable mission state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::ai::{Finding, Usage};
use crate::error_handling::MissionError;
use crate::models::ScanLevel;
use crate::probe::ProbeKind;

use super::report::MissionReport;

/// Lifecycle phase of the mission controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MissionPhase {
    /// Idle, ready for a mission
    Briefing,
    /// A mission is running
    Simulation,
    /// The last mission produced a report
    Debriefing,
    /// The last mission failed
    Error,
}

/// Finer-grained stage within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Reconnaissance,
    Probing,
    Analyzing,
    Assembling,
    Complete,
    Failed,
}

/// Severity of a telemetry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One human-readable progress line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryLine {
    pub timestamp: DateTime<Utc>,
    pub level: TelemetryLevel,
    pub message: String,
}

impl TelemetryLine {
    pub fn new(level: TelemetryLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Snapshot published on the state watch channel.
///
/// A terminal mission carries exactly one of `mission_report` (Debriefing) or
/// `error` (Error).
#[derive(Debug, Clone, Serialize)]
pub struct MissionState {
    pub mission_phase: MissionPhase,
    pub scan_status: ScanStatus,
    /// 0 to 100, never decreasing within one mission
    pub progress: u8,
    pub telemetry: Vec<TelemetryLine>,
    pub usage: Option<Usage>,
    pub target_url: Option<String>,
    pub current_level: ScanLevel,
    pub language: String,
    pub mission_report: Option<Arc<MissionReport>>,
    /// Most recent findings, oldest first
    pub recent_findings: Vec<Finding>,
    /// Probe kinds dispatched so far, in dispatch order
    pub dispatched_probes: Vec<ProbeKind>,
    pub error: Option<MissionError>,
    /// Incremented by every accepted mission and every reset
    pub generation: u64,
}

impl Default for MissionState {
    fn default() -> Self {
        Self {
            mission_phase: MissionPhase::Briefing,
            scan_status: ScanStatus::Idle,
            progress: 0,
            telemetry: Vec::new(),
            usage: None,
            target_url: None,
            current_level: ScanLevel::Standard,
            language: "en".to_string(),
            mission_report: None,
            recent_findings: Vec::new(),
            dispatched_probes: Vec::new(),
            error: None,
            generation: 0,
        }
    }
}

/// Push notifications published on the event broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionEvent {
    Telemetry(TelemetryLine),
    Finding(Finding),
    Progress(u8),
    ProbeDispatched(ProbeKind),
    PhaseChanged(MissionPhase),
}
