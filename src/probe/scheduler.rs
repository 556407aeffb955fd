//! Probe batching and pacing.
//!
//! The scheduler resolves cache hits first, then partitions the remaining
//! probes of a scan level into fixed-size batches. Probes within a batch run
//! concurrently as spawned tasks; a cooldown follows every executed batch.
//! Because each probe is its own task, an abandoned run still lets in-flight
//! probes finish and populate the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use hickory_resolver::TokioAsyncResolver;
use log::{debug, warn};
use tokio::time::Instant;

use crate::config::Config;
use crate::error_handling::ProbeError;
use crate::models::ScanLevel;

use super::cache::ProbeCache;
use super::dns::DnsProbe;
use super::geo::GeoProbe;
use super::headers::HeadersProbe;
use super::ssl_grade::SslGradeProbe;
use super::target::ProbeTarget;
use super::tls::TlsProbe;
use super::types::{Probe, ProbeKind, ProbeResult};
use super::well_known::WellKnownProbe;

/// Probe implementations by kind.
#[derive(Default, Clone)]
pub struct ProbeRegistry {
    probes: HashMap<ProbeKind, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `probe` under its own kind, replacing any previous one.
    pub fn with(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.insert(probe.kind(), probe);
        self
    }

    /// Returns the probe registered for `kind`.
    pub fn get(&self, kind: ProbeKind) -> Option<Arc<dyn Probe>> {
        self.probes.get(&kind).cloned()
    }

    /// Registry of the built-in network probes.
    pub fn standard(
        client: reqwest::Client,
        resolver: Arc<TokioAsyncResolver>,
        config: &Config,
    ) -> Self {
        Self::new()
            .with(Arc::new(DnsProbe::new(resolver)))
            .with(Arc::new(HeadersProbe::new(client.clone())))
            .with(Arc::new(GeoProbe::new(client.clone(), config.geo_url.clone())))
            .with(Arc::new(TlsProbe::new()))
            .with(Arc::new(WellKnownProbe::security_txt(client.clone())))
            .with(Arc::new(SslGradeProbe::new(
                client.clone(),
                config.ssl_labs_url.clone(),
            )))
            .with(Arc::new(WellKnownProbe::robots_txt(client)))
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("kinds", &self.probes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Progress notification emitted while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// A cached result satisfied this kind; no slot was used.
    CacheHit {
        /// Probe kind
        kind: ProbeKind,
    },
    /// A batch was dispatched.
    BatchDispatched {
        /// Zero-based batch index
        index: usize,
        /// Number of batches in this run
        total: usize,
        /// Kinds dispatched together
        kinds: Vec<ProbeKind>,
    },
    /// A probe finished successfully.
    Completed {
        /// Probe kind
        kind: ProbeKind,
        /// Time the probe took
        elapsed: Duration,
    },
    /// A probe failed.
    Failed {
        /// Probe kind
        kind: ProbeKind,
        /// Failure; fatal errors end the run
        error: ProbeError,
    },
    /// Every probe of a batch has reported.
    BatchFinished {
        /// Zero-based batch index
        index: usize,
        /// Number of batches in this run
        total: usize,
    },
}

/// A probe that failed without aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeFailure {
    /// Probe kind
    pub kind: ProbeKind,
    /// What went wrong
    pub error: ProbeError,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct ProbeRun {
    /// Successful results, in the scan level's declared order
    pub results: Vec<ProbeResult>,
    /// Transient failures, in completion order
    pub failures: Vec<ProbeFailure>,
    /// Kinds served from the cache
    pub cache_hits: Vec<ProbeKind>,
    /// Number of batches executed
    pub batches: usize,
}

type ProbeOutcome = Result<(ProbeResult, Duration), ProbeError>;

/// Runs the probe set of a scan level in paced batches.
#[derive(Debug, Clone)]
pub struct ProbeScheduler {
    cache: Arc<ProbeCache>,
    registry: Arc<ProbeRegistry>,
    batch_size: usize,
    cooldown: Duration,
}

impl ProbeScheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    ///
    /// * `cache` - Shared probe cache
    /// * `registry` - Probe implementations
    /// * `batch_size` - Probes per batch (values below 1 are treated as 1)
    /// * `cooldown` - Pause observed after every executed batch
    pub fn new(
        cache: Arc<ProbeCache>,
        registry: Arc<ProbeRegistry>,
        batch_size: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            cache,
            registry,
            batch_size: batch_size.max(1),
            cooldown,
        }
    }

    /// Runs every probe of `level` against `target`.
    ///
    /// # Arguments
    ///
    /// * `level` - Scan level selecting the probe set
    /// * `target` - Validated target
    /// * `observer` - Receives progress events as they happen
    ///
    /// # Returns
    ///
    /// The collected results. Transient probe failures are listed in
    /// [`ProbeRun::failures`] and leave that kind absent.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ProbeError`]; remaining probes of that
    /// batch keep running detached and still write the cache.
    pub async fn run<F>(
        &self,
        level: ScanLevel,
        target: &ProbeTarget,
        mut observer: F,
    ) -> Result<ProbeRun, ProbeError>
    where
        F: FnMut(ProbeEvent) + Send,
    {
        let kinds = level.probe_kinds();
        let mut collected: HashMap<ProbeKind, ProbeResult> = HashMap::new();
        let mut run = ProbeRun::default();
        let mut pending: Vec<ProbeKind> = Vec::new();

        for &kind in kinds {
            match self.cache.get(&target.host, kind) {
                Some(hit) => {
                    debug!("Probe cache hit: {} {kind}", target.host);
                    observer(ProbeEvent::CacheHit { kind });
                    run.cache_hits.push(kind);
                    collected.insert(kind, hit);
                }
                None => pending.push(kind),
            }
        }

        let batches: Vec<&[ProbeKind]> = pending.chunks(self.batch_size).collect();
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            observer(ProbeEvent::BatchDispatched {
                index,
                total,
                kinds: batch.to_vec(),
            });

            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|&kind| {
                    let handle = self.spawn_probe(kind, target);
                    async move { (kind, handle.await) }
                })
                .collect();

            while let Some((kind, joined)) = in_flight.next().await {
                let outcome = joined.unwrap_or_else(|e| {
                    Err(ProbeError::Other(format!("probe task failed: {e}")))
                });
                match outcome {
                    Ok((result, elapsed)) => {
                        observer(ProbeEvent::Completed { kind, elapsed });
                        collected.insert(kind, result);
                    }
                    Err(error) if error.is_fatal() => {
                        warn!("Fatal {kind} probe failure for {}: {error}", target.host);
                        observer(ProbeEvent::Failed {
                            kind,
                            error: error.clone(),
                        });
                        return Err(error);
                    }
                    Err(error) => {
                        warn!("{kind} probe failed for {}: {error}", target.host);
                        observer(ProbeEvent::Failed {
                            kind,
                            error: error.clone(),
                        });
                        run.failures.push(ProbeFailure { kind, error });
                    }
                }
            }

            run.batches += 1;
            observer(ProbeEvent::BatchFinished { index, total });
            tokio::time::sleep(self.cooldown).await;
        }

        run.results = kinds
            .iter()
            .filter_map(|kind| collected.remove(kind))
            .collect();
        Ok(run)
    }

    fn spawn_probe(
        &self,
        kind: ProbeKind,
        target: &ProbeTarget,
    ) -> tokio::task::JoinHandle<ProbeOutcome> {
        let probe = self.registry.get(kind);
        let cache = Arc::clone(&self.cache);
        let target = target.clone();

        tokio::spawn(async move {
            let probe = probe
                .ok_or_else(|| ProbeError::Other(format!("no probe registered for {kind}")))?;
            let started = Instant::now();
            let payload = probe.run(&target).await?;
            let result = ProbeResult::new(kind, payload);
            cache.put(&target.host, kind, result.clone(), kind.ttl());
            Ok((result, started.elapsed()))
        })
    }
}
