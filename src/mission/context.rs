//! Process-wide mission collaborators.
//!
//! A controller refuses a second mission while one is running, so concurrent
//! missions need one controller each. Controllers built from the same
//! `MissionContext` share its probe cache, its AI cooldown gate and its usage
//! totals.

use std::sync::Arc;

use crate::ai::{AiGateway, AnalysisProvider, CooldownGate, GeminiProvider, UsageTotals};
use crate::config::Config;
use crate::error_handling::InitializationError;
use crate::initialization::{init_client, init_resolver};
use crate::probe::{ProbeCache, ProbeRegistry, ProbeScheduler};

use super::controller::MissionController;
use super::page::{HttpPageSource, PageSource};

/// Shared state for every controller of a process. Cloning is cheap and
/// keeps sharing.
#[derive(Clone)]
pub struct MissionContext {
    page_source: Arc<dyn PageSource>,
    scheduler: ProbeScheduler,
    gateway: AiGateway,
}

impl MissionContext {
    /// Creates a context around one cache, one gate and one usage
    /// accumulator, with the pacing and retry settings of `config`.
    pub fn new(
        page_source: Arc<dyn PageSource>,
        registry: ProbeRegistry,
        provider: Arc<dyn AnalysisProvider>,
        config: &Config,
    ) -> Self {
        let scheduler = ProbeScheduler::new(
            Arc::new(ProbeCache::new()),
            Arc::new(registry),
            config.probe_batch_size,
            config.probe_batch_cooldown,
        );
        let gateway = AiGateway::from_config(
            provider,
            Arc::new(CooldownGate::new(config.ai_cooldown)),
            config,
        );
        Self {
            page_source,
            scheduler,
            gateway,
        }
    }

    /// Creates a context with the built-in page fetch, network probes and
    /// Gemini provider.
    ///
    /// # Errors
    ///
    /// Returns an `InitializationError` if the HTTP client, the DNS resolver or
    /// the provider's client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, InitializationError> {
        let client = init_client(config)?;
        let resolver = init_resolver()?;
        let registry = ProbeRegistry::standard(client.clone(), resolver, config);
        let provider = GeminiProvider::new(config)?;
        Ok(Self::new(
            Arc::new(HttpPageSource::new(client)),
            registry,
            Arc::new(provider),
            config,
        ))
    }

    /// A new controller sharing this context's cache, gate and usage totals.
    pub fn controller(&self) -> MissionController {
        MissionController::new(
            Arc::clone(&self.page_source),
            self.scheduler.clone(),
            self.gateway.clone(),
        )
    }

    /// Process-wide analysis usage.
    pub fn usage_totals(&self) -> &Arc<UsageTotals> {
        self.gateway.totals()
    }
}
