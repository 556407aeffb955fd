//! recon_mission library: scan orchestration for a single website
//!
//! A mission takes a target URL and a scan level and produces a versioned
//! report. It fetches the page and confirms technologies from evidence. It
//! runs paced, cached network probes (DNS, headers, TLS, hosting, SSL grade,
//! well-known files). Finally it asks an AI model for an analysis, admitted
//! through a process-wide cooldown gate and retried on transient failures.
//!
//! # Example
//!
//! ```no_run
//! use recon_mission::{Config, MissionContext, MissionOutcome, ScanLevel};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     api_key: Config::api_key_from_env(),
//!     ..Default::default()
//! };
//! recon_mission::initialization::init_crypto_provider();
//! // Controllers from one context share the probe cache and the AI cooldown gate.
//! let context = MissionContext::from_config(&config)?;
//! let controller = context.controller();
//!
//! match controller.run_mission("example.com", ScanLevel::Standard, "en").await {
//!     MissionOutcome::Completed(report) => println!("{}", report.to_json_pretty()?),
//!     MissionOutcome::Failed(error) => eprintln!("{error}: {}", error.kind.remediation()),
//!     other => eprintln!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod ai;
pub mod config;
pub mod error_handling;
pub mod fingerprint;
pub mod initialization;
pub mod mission;
pub mod models;
pub mod probe;

// Re-export public API
pub use ai::{AiGateway, CooldownGate, Finding, Severity, Usage};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{MissionError, MissionErrorKind, ProbeError};
pub use fingerprint::{detect, TechCategory, TechSignature};
pub use mission::{
    MissionContext, MissionController, MissionEvent, MissionOutcome, MissionPhase, MissionReport,
    MissionState,
};
pub use models::ScanLevel;
pub use probe::{ProbeCache, ProbeKind, ProbeResult, ProbeScheduler, ProbeTarget};
