//! Error handling.
//!
//! This module provides:
//! - The mission error taxonomy (`MissionError`, `MissionErrorKind`)
//! - Probe failure classification (`ProbeError`)
//! - Initialization errors
//! - Categorization of transport errors and provider responses
//!
//! Probe failures are split into:
//! - **Fatal**: the target provably does not exist; the mission aborts
//! - **Transient**: the probe result is absent; the mission continues

mod categorization;
mod types;

// Re-export public API
pub use categorization::{
    categorize_probe_error, categorize_provider_status, categorize_reqwest_error,
    get_retry_strategy,
};
pub use types::{InitializationError, MissionError, MissionErrorKind, ProbeError};
