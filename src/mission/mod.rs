//! Mission orchestration.
//!
//! A mission fetches the target page, runs the probe set of the chosen scan
//! level, confirms technologies with the fingerprint matcher, asks the AI
//! gateway for an analysis and assembles a versioned report. The controller
//! publishes every step on a watch channel (full state) and a broadcast
//! channel (telemetry, findings, progress).

mod context;
mod controller;
mod page;
mod report;
mod state;

pub use context::MissionContext;
pub use controller::{MissionController, MissionOutcome};
pub use page::{HttpPageSource, PageSnapshot, PageSource};
pub use report::{FailedProbe, MissionReport, ReportParts, TargetIntelligence};
pub use state::{
    MissionEvent, MissionPhase, MissionState, ScanStatus, TelemetryLevel, TelemetryLine,
};
