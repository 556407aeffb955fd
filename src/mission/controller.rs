//! Mission state machine.
//!
//! `Briefing -> Simulation -> Debriefing`, or `Simulation -> Error`.
//!
//! Every accepted mission and every reset bumps a generation counter. State
//! updates carry the generation they belong to and are dropped once it is
//! stale, so a reset mission can never write into its successor. A reset also
//! cancels the running mission's token; spawned probe tasks are not aborted
//! and still finish their cache writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::ai::{AiGateway, AnalysisContext, GatewayEvent, UsageTotals};
use crate::config::{Config, EVENT_CHANNEL_CAPACITY, RECENT_FINDINGS_LIMIT};
use crate::error_handling::{InitializationError, MissionError};
use crate::fingerprint::{self, TechSignature};
use crate::models::ScanLevel;
use crate::probe::{ProbeEvent, ProbeKind, ProbeResult, ProbeRun, ProbeScheduler, ProbeTarget};

use super::context::MissionContext;
use super::page::{PageSnapshot, PageSource};
use super::report::{MissionReport, ReportParts};
use super::state::{
    MissionEvent, MissionPhase, MissionState, ScanStatus, TelemetryLevel, TelemetryLine,
};

// Progress bands of the pipeline stages.
const PROGRESS_PAGE_DONE: u8 = 10;
const PROGRESS_PROBES_START: u8 = 10;
const PROGRESS_PROBES_END: u8 = 60;
const PROGRESS_AI_START: u8 = 60;
const PROGRESS_AI_END: u8 = 90;
const PROGRESS_AI_STEP: u8 = 5;
const PROGRESS_COMPLETE: u8 = 100;

/// How a `run_mission` call ended.
#[derive(Debug, Clone)]
pub enum MissionOutcome {
    /// The mission produced a report (now in Debriefing).
    Completed(Arc<MissionReport>),
    /// The mission failed (now in Error).
    Failed(MissionError),
    /// The mission was reset while running; its results were discarded.
    Abandoned,
    /// The request was refused because a mission is running or an error is
    /// pending acknowledgement.
    Rejected(MissionPhase),
}

/// Drives missions and publishes their state.
pub struct MissionController {
    page_source: Arc<dyn PageSource>,
    scheduler: ProbeScheduler,
    gateway: AiGateway,
    state_tx: watch::Sender<MissionState>,
    events_tx: broadcast::Sender<MissionEvent>,
    generation: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

impl MissionController {
    /// Creates a controller from its collaborators.
    ///
    /// Share one `ProbeCache` and one `CooldownGate` between controllers to
    /// keep caching and AI admission process-wide; [`MissionContext`] does
    /// this for you.
    pub fn new(page_source: Arc<dyn PageSource>, scheduler: ProbeScheduler, gateway: AiGateway) -> Self {
        let (state_tx, _) = watch::channel(MissionState::default());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            page_source,
            scheduler,
            gateway,
            state_tx,
            events_tx,
            generation: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Creates a controller with the built-in page fetch, network probes and
    /// Gemini provider, in a context of its own.
    ///
    /// Controllers that run missions concurrently should come from one
    /// [`MissionContext`] instead, so they share the AI cooldown gate.
    ///
    /// # Errors
    ///
    /// Returns an `InitializationError` if the HTTP client, the DNS resolver or
    /// the provider's client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, InitializationError> {
        Ok(MissionContext::from_config(config)?.controller())
    }

    /// Watch channel of the full state.
    pub fn subscribe(&self) -> watch::Receiver<MissionState> {
        self.state_tx.subscribe()
    }

    /// Broadcast stream of telemetry, findings, progress and phase changes.
    pub fn events(&self) -> broadcast::Receiver<MissionEvent> {
        self.events_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> MissionState {
        self.state_tx.borrow().clone()
    }

    /// Process-wide analysis usage.
    pub fn usage_totals(&self) -> &Arc<UsageTotals> {
        self.gateway.totals()
    }

    /// Runs one mission to completion.
    ///
    /// Accepted from Briefing or Debriefing; refused from Simulation and
    /// Error (see [`clear_error`](Self::clear_error)).
    ///
    /// # Arguments
    ///
    /// * `url` - Target URL; `https://` is assumed when no scheme is given
    /// * `level` - Scan level
    /// * `language` - Locale for the analysis text
    pub async fn run_mission(&self, url: &str, level: ScanLevel, language: &str) -> MissionOutcome {
        let Some((generation, token)) = self.accept(url, level, language) else {
            let phase = self.state_tx.borrow().mission_phase;
            warn!("Mission request for {url} rejected in phase {phase}");
            return MissionOutcome::Rejected(phase);
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Mission for {url} abandoned");
                MissionOutcome::Abandoned
            }
            outcome = self.execute(generation, url, level, language) => outcome,
        }
    }

    /// Returns to Briefing from any state, discarding telemetry, report and
    /// error, and abandoning a running mission.
    pub fn reset_mission(&self) {
        // Same critical section as `accept`, so a concurrent accept lands
        // either wholly before or wholly after the reset.
        self.state_tx.send_modify(|state| {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
                cancel.cancel();
                *cancel = CancellationToken::new();
            }
            *state = MissionState {
                generation,
                ..MissionState::default()
            };
        });
        self.emit(MissionEvent::PhaseChanged(MissionPhase::Briefing));
        info!("Mission reset");
    }

    /// Acknowledges a failed mission: Error -> Briefing, keeping the target
    /// URL and level for a retry. Returns whether anything changed.
    pub fn clear_error(&self) -> bool {
        let changed = self.state_tx.send_if_modified(|state| {
            if state.mission_phase != MissionPhase::Error {
                return false;
            }
            state.mission_phase = MissionPhase::Briefing;
            state.scan_status = ScanStatus::Idle;
            state.error = None;
            state.progress = 0;
            true
        });
        if changed {
            self.emit(MissionEvent::PhaseChanged(MissionPhase::Briefing));
        }
        changed
    }

    /// Atomically checks the phase and enters Simulation.
    fn accept(&self, url: &str, level: ScanLevel, language: &str) -> Option<(u64, CancellationToken)> {
        let mut accepted = None;
        self.state_tx.send_if_modified(|state| {
            if !matches!(
                state.mission_phase,
                MissionPhase::Briefing | MissionPhase::Debriefing
            ) {
                return false;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let token = {
                let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
                *cancel = CancellationToken::new();
                cancel.clone()
            };
            *state = MissionState {
                mission_phase: MissionPhase::Simulation,
                scan_status: ScanStatus::Reconnaissance,
                target_url: Some(url.to_string()),
                current_level: level,
                language: language.to_string(),
                generation,
                ..MissionState::default()
            };
            accepted = Some((generation, token));
            true
        });
        if accepted.is_some() {
            self.emit(MissionEvent::PhaseChanged(MissionPhase::Simulation));
        }
        accepted
    }

    fn emit(&self, event: MissionEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    /// Applies `f` if `generation` is still current. Returns whether it was applied.
    fn update<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut MissionState),
    {
        self.state_tx.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            f(state);
            true
        })
    }

    fn telemetry(&self, generation: u64, level: TelemetryLevel, message: impl Into<String>) {
        let line = TelemetryLine::new(level, message);
        match level {
            TelemetryLevel::Error => error!("{}", line.message),
            TelemetryLevel::Warning => warn!("{}", line.message),
            TelemetryLevel::Info | TelemetryLevel::Success => info!("{}", line.message),
        }
        let pushed = line.clone();
        if self.update(generation, move |state| state.telemetry.push(pushed)) {
            self.emit(MissionEvent::Telemetry(line));
        }
    }

    /// Raises progress to `value`; lower values are ignored.
    fn progress(&self, generation: u64, value: u8) {
        let value = value.min(PROGRESS_COMPLETE);
        let mut raised = false;
        self.update(generation, |state| {
            if value > state.progress {
                state.progress = value;
                raised = true;
            }
        });
        if raised {
            self.emit(MissionEvent::Progress(value));
        }
    }

    fn status(&self, generation: u64, status: ScanStatus) {
        self.update(generation, |state| state.scan_status = status);
    }

    fn fail(&self, generation: u64, error: MissionError) -> MissionOutcome {
        self.telemetry(
            generation,
            TelemetryLevel::Error,
            format!("Mission failed ({}): {}", error.kind, error.message),
        );
        let failed = error.clone();
        if self.update(generation, move |state| {
            state.mission_phase = MissionPhase::Error;
            state.scan_status = ScanStatus::Failed;
            state.mission_report = None;
            state.error = Some(failed);
        }) {
            self.emit(MissionEvent::PhaseChanged(MissionPhase::Error));
        }
        MissionOutcome::Failed(error)
    }

    async fn execute(&self, generation: u64, url: &str, level: ScanLevel, language: &str) -> MissionOutcome {
        let started_at = Utc::now();
        let target = match ProbeTarget::parse(url) {
            Ok(target) => target,
            Err(error) => return self.fail(generation, error),
        };
        self.update(generation, |state| {
            state.target_url = Some(target.url.to_string())
        });
        self.telemetry(
            generation,
            TelemetryLevel::Info,
            format!("Mission started: {} ({level})", target.url),
        );

        // Page fetch and probes run concurrently.
        let (page, probe_run) = tokio::join!(
            self.reconnaissance(generation, &target),
            self.run_probes(generation, level, &target),
        );
        let probe_run = match probe_run {
            Ok(run) => run,
            Err(error) => return self.fail(generation, error),
        };

        let technologies = self.fingerprint(generation, page.as_ref(), &probe_run.results);

        self.status(generation, ScanStatus::Analyzing);
        self.progress(generation, PROGRESS_AI_START);
        self.telemetry(
            generation,
            TelemetryLevel::Info,
            format!(
                "Requesting analysis with {} confirmed technolog{} and {} probe result(s)",
                technologies.len(),
                if technologies.len() == 1 { "y" } else { "ies" },
                probe_run.results.len()
            ),
        );

        let context = AnalysisContext {
            target_url: target.url.to_string(),
            level,
            language: language.to_string(),
            page_title: page.as_ref().and_then(|p| p.title.clone()),
        };
        let analysis = match self
            .gateway
            .analyze_with(&technologies, &probe_run.results, &context, |event| {
                self.on_gateway_event(generation, event)
            })
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => return self.fail(generation, error),
        };
        self.progress(generation, PROGRESS_AI_END);

        for finding in &analysis.analysis.findings {
            let pushed = finding.clone();
            if self.update(generation, move |state| {
                state.recent_findings.push(pushed);
                let overflow = state
                    .recent_findings
                    .len()
                    .saturating_sub(RECENT_FINDINGS_LIMIT);
                state.recent_findings.drain(..overflow);
            }) {
                self.emit(MissionEvent::Finding(finding.clone()));
            }
        }

        self.status(generation, ScanStatus::Assembling);
        let usage = analysis.usage;
        let report = Arc::new(MissionReport::assemble(ReportParts {
            target_url: target.url.as_str(),
            level,
            language,
            technologies,
            probes: probe_run.results,
            failures: &probe_run.failures,
            cache_hits: &probe_run.cache_hits,
            page: page.as_ref(),
            analysis,
            started_at,
        }));

        self.telemetry(
            generation,
            TelemetryLevel::Success,
            format!(
                "Mission complete: {} finding(s), {} token(s), {} attempt(s)",
                report.findings.len(),
                usage.total_tokens,
                usage.attempts
            ),
        );
        let stored = Arc::clone(&report);
        if self.update(generation, move |state| {
            state.mission_phase = MissionPhase::Debriefing;
            state.scan_status = ScanStatus::Complete;
            state.progress = PROGRESS_COMPLETE;
            state.usage = Some(usage);
            state.mission_report = Some(stored);
            state.error = None;
        }) {
            self.emit(MissionEvent::Progress(PROGRESS_COMPLETE));
            self.emit(MissionEvent::PhaseChanged(MissionPhase::Debriefing));
            MissionOutcome::Completed(report)
        } else {
            MissionOutcome::Abandoned
        }
    }

    /// Fetches the page. A failed fetch is not fatal: fingerprinting then
    /// falls back to the header probe's snapshot.
    async fn reconnaissance(&self, generation: u64, target: &ProbeTarget) -> Option<PageSnapshot> {
        let page = match self.page_source.fetch(&target.url).await {
            Ok(page) => {
                self.telemetry(
                    generation,
                    TelemetryLevel::Info,
                    format!("Page fetched: HTTP {} from {}", page.status, page.final_url),
                );
                Some(page)
            }
            Err(e) => {
                self.telemetry(
                    generation,
                    TelemetryLevel::Warning,
                    format!("Page fetch failed: {e:#}"),
                );
                None
            }
        };
        self.progress(generation, PROGRESS_PAGE_DONE);
        page
    }

    async fn run_probes(
        &self,
        generation: u64,
        level: ScanLevel,
        target: &ProbeTarget,
    ) -> Result<ProbeRun, MissionError> {
        let total = level.probe_kinds().len().max(1);
        let mut done = 0usize;

        let result = self
            .scheduler
            .run(level, target, |event| {
                if matches!(
                    event,
                    ProbeEvent::CacheHit { .. }
                        | ProbeEvent::Completed { .. }
                        | ProbeEvent::Failed { .. }
                ) {
                    done += 1;
                }
                self.on_probe_event(generation, event);
                let span = usize::from(PROGRESS_PROBES_END - PROGRESS_PROBES_START);
                let value = PROGRESS_PROBES_START as usize + span * done / total;
                self.progress(generation, value as u8);
            })
            .await;

        match result {
            Ok(run) => {
                self.telemetry(
                    generation,
                    TelemetryLevel::Success,
                    format!(
                        "Probes finished: {} result(s), {} cached, {} failed",
                        run.results.len(),
                        run.cache_hits.len(),
                        run.failures.len()
                    ),
                );
                self.progress(generation, PROGRESS_PROBES_END);
                Ok(run)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn on_probe_event(&self, generation: u64, event: ProbeEvent) {
        match event {
            ProbeEvent::CacheHit { kind } => {
                self.telemetry(generation, TelemetryLevel::Info, format!("{kind}: cached result"));
            }
            ProbeEvent::BatchDispatched { index, total, kinds } => {
                self.status(generation, ScanStatus::Probing);
                let names: Vec<String> = kinds.iter().map(ProbeKind::to_string).collect();
                self.telemetry(
                    generation,
                    TelemetryLevel::Info,
                    format!("Dispatching probe batch {}/{total}: {}", index + 1, names.join(", ")),
                );
                for kind in kinds {
                    if self.update(generation, |state| state.dispatched_probes.push(kind)) {
                        self.emit(MissionEvent::ProbeDispatched(kind));
                    }
                }
            }
            ProbeEvent::Completed { kind, elapsed } => {
                self.telemetry(
                    generation,
                    TelemetryLevel::Success,
                    format!("{kind}: done in {} ms", elapsed.as_millis()),
                );
            }
            ProbeEvent::Failed { kind, error } => {
                let level = if error.is_fatal() {
                    TelemetryLevel::Error
                } else {
                    TelemetryLevel::Warning
                };
                self.telemetry(generation, level, format!("{kind}: {error}"));
            }
            ProbeEvent::BatchFinished { .. } => {}
        }
    }

    fn on_gateway_event(&self, generation: u64, event: GatewayEvent) {
        match event {
            GatewayEvent::Attempt { attempt } => {
                let step = PROGRESS_AI_STEP.saturating_mul(attempt.saturating_sub(1).min(5) as u8);
                self.progress(generation, PROGRESS_AI_START + step);
                if attempt > 1 {
                    self.telemetry(
                        generation,
                        TelemetryLevel::Info,
                        format!("Analysis attempt {attempt}"),
                    );
                }
            }
            GatewayEvent::Retrying {
                attempt,
                kind,
                delay,
            } => {
                self.telemetry(
                    generation,
                    TelemetryLevel::Warning,
                    format!(
                        "Analysis attempt {attempt} failed ({kind}); retrying in {:.1}s",
                        delay.as_secs_f64()
                    ),
                );
            }
        }
    }

    /// Confirms technologies from the page, falling back to the header
    /// probe's snapshot when the page fetch failed.
    fn fingerprint(
        &self,
        generation: u64,
        page: Option<&PageSnapshot>,
        probes: &[ProbeResult],
    ) -> Vec<TechSignature> {
        let fallback_headers;
        let (content, headers) = match page {
            Some(page) => (Some(page.body.as_str()), Some(&page.headers)),
            None => {
                fallback_headers = probes
                    .iter()
                    .find(|p| p.kind == ProbeKind::HttpHeaders)
                    .and_then(|p| {
                        serde_json::from_value::<std::collections::HashMap<String, String>>(
                            p.payload["headers"].clone(),
                        )
                        .ok()
                    });
                (None, fallback_headers.as_ref())
            }
        };

        let technologies = fingerprint::detect(content, headers);
        for tech in &technologies {
            let version = tech
                .version
                .as_deref()
                .map(|v| format!(" {v}"))
                .unwrap_or_default();
            self.telemetry(
                generation,
                TelemetryLevel::Success,
                format!("Confirmed {}{version} ({}) via {}", tech.name, tech.category, tech.evidence),
            );
        }
        technologies
    }
}
