//! AI analysis gateway.
//!
//! This module provides:
//! - The provider abstraction and the Gemini implementation
//! - A process-wide cooldown gate that spaces model API calls
//! - The retry policy for transient failures (`rate_limit`, `service_busy`)
//! - Prompt construction with the fingerprint ground truth embedded verbatim
//! - Usage accounting per call and per process

mod backoff;
mod gate;
mod gateway;
mod prompt;
mod provider;
mod types;

pub use backoff::{retry_delay, RetryPolicy};
pub use gate::CooldownGate;
pub use gateway::{AiGateway, GatewayEvent, UsageSnapshot, UsageTotals};
pub use prompt::build_request;
pub use provider::{AnalysisProvider, GeminiProvider};
pub use types::{
    AnalysisContext, AnalysisOutcome, AnalysisRequest, AnalysisResult, Finding,
    ProviderResponse, Severity, TokenUsage, Usage,
};
