//! Rate-limited, retrying analysis calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{Config, CHARS_PER_TOKEN_ESTIMATE};
use crate::error_handling::{MissionError, MissionErrorKind};
use crate::fingerprint::TechSignature;
use crate::probe::ProbeResult;

use super::backoff::RetryPolicy;
use super::gate::CooldownGate;
use super::prompt::build_request;
use super::provider::AnalysisProvider;
use super::types::{
    AnalysisContext, AnalysisOutcome, AnalysisRequest, AnalysisResult, ProviderResponse,
    TokenUsage, Usage,
};

/// Progress of one `analyze` call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// An attempt was admitted by the cooldown gate and sent.
    Attempt {
        /// 1-based attempt number
        attempt: u32,
    },
    /// A transient failure will be retried after `delay`.
    Retrying {
        /// Attempt that failed
        attempt: u32,
        /// Failure kind
        kind: MissionErrorKind,
        /// Backoff before the next attempt
        delay: Duration,
    },
}

/// Usage accumulated across every analysis in this process.
#[derive(Debug, Default)]
pub struct UsageTotals {
    calls: AtomicU64,
    attempts: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    thinking_tokens: AtomicU64,
}

/// Point-in-time copy of [`UsageTotals`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub calls: u64,
    pub attempts: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub thinking_tokens: u64,
}

impl UsageTotals {
    fn record(&self, attempts: u32, tokens: Option<TokenUsage>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.attempts.fetch_add(u64::from(attempts), Ordering::Relaxed);
        if let Some(tokens) = tokens {
            self.prompt_tokens
                .fetch_add(tokens.prompt_tokens, Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(tokens.completion_tokens, Ordering::Relaxed);
            self.thinking_tokens
                .fetch_add(tokens.thinking_tokens, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            thinking_tokens: self.thinking_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Sends analysis requests through the cooldown gate and retries transient
/// failures.
///
/// Every attempt, retries included, passes the gate. Non-transient failures
/// are returned on the first occurrence; after the last permitted attempt the
/// last failure is returned as-is.
#[derive(Clone)]
pub struct AiGateway {
    provider: Arc<dyn AnalysisProvider>,
    gate: Arc<CooldownGate>,
    policy: RetryPolicy,
    totals: Arc<UsageTotals>,
}

impl AiGateway {
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        gate: Arc<CooldownGate>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            gate,
            policy,
            totals: Arc::new(UsageTotals::default()),
        }
    }

    /// Gateway with the pacing and retry settings of `config`.
    pub fn from_config(
        provider: Arc<dyn AnalysisProvider>,
        gate: Arc<CooldownGate>,
        config: &Config,
    ) -> Self {
        Self::new(
            provider,
            gate,
            RetryPolicy {
                max_attempts: config.ai_max_attempts.max(1),
                base_delay: config.ai_retry_base_delay,
                max_jitter_ms: config.ai_retry_max_jitter_ms,
            },
        )
    }

    /// Shares a process-wide usage accumulator with other gateways.
    pub fn with_totals(mut self, totals: Arc<UsageTotals>) -> Self {
        self.totals = totals;
        self
    }

    pub fn totals(&self) -> &Arc<UsageTotals> {
        &self.totals
    }

    /// Runs one logical analysis.
    pub async fn analyze(
        &self,
        ground_truth: &[TechSignature],
        probes: &[ProbeResult],
        context: &AnalysisContext,
    ) -> Result<AnalysisOutcome, MissionError> {
        self.analyze_with(ground_truth, probes, context, |_| {})
            .await
    }

    /// Like [`analyze`](Self::analyze), reporting attempts and retries to `observer`.
    pub async fn analyze_with<F>(
        &self,
        ground_truth: &[TechSignature],
        probes: &[ProbeResult],
        context: &AnalysisContext,
        mut observer: F,
    ) -> Result<AnalysisOutcome, MissionError>
    where
        F: FnMut(GatewayEvent) + Send,
    {
        let request = build_request(ground_truth, probes, context);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.gate.admit().await;
            observer(GatewayEvent::Attempt { attempt });
            info!(
                "Analysis attempt {attempt}/{} via {} ({})",
                self.policy.max_attempts,
                self.provider.name(),
                self.provider.model()
            );

            match self.provider.generate(&request).await {
                Ok(response) => {
                    let (analysis, usage) =
                        self.finish(&request, response, attempt, started.elapsed())?;
                    return Ok(AnalysisOutcome { analysis, usage });
                }
                Err(error) if error.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = {
                        let mut rng = rand::rng();
                        self.policy.delay(attempt, &mut rng)
                    };
                    warn!(
                        "Analysis attempt {attempt} failed ({}), retrying in {:.1}s",
                        error.kind,
                        delay.as_secs_f64()
                    );
                    observer(GatewayEvent::Retrying {
                        attempt,
                        kind: error.kind,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!("Analysis failed after {attempt} attempt(s): {error}");
                    self.totals.record(attempt, None);
                    return Err(error);
                }
            }
        }
    }

    fn finish(
        &self,
        request: &AnalysisRequest,
        response: ProviderResponse,
        attempts: u32,
        elapsed: Duration,
    ) -> Result<(AnalysisResult, Usage), MissionError> {
        let (tokens, estimated) = match response.usage {
            Some(tokens) => (tokens, false),
            None => (estimate_usage(request, &response.text), true),
        };
        self.totals.record(attempts, Some(tokens));

        let analysis = parse_analysis(&response.text)?;
        let usage = Usage {
            tokens,
            total_tokens: tokens.total(),
            estimated,
            attempts,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        };
        Ok((analysis, usage))
    }
}

fn estimate_tokens(text: &str) -> u64 {
    (text.len() / CHARS_PER_TOKEN_ESTIMATE) as u64
}

fn estimate_usage(request: &AnalysisRequest, answer: &str) -> TokenUsage {
    TokenUsage {
        prompt_tokens: estimate_tokens(&request.system_prompt)
            + estimate_tokens(&request.user_prompt),
        completion_tokens: estimate_tokens(answer),
        thinking_tokens: 0,
    }
}

/// Parses the model's JSON answer, tolerating a Markdown code fence around it.
fn parse_analysis(text: &str) -> Result<AnalysisResult, MissionError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(unfenced)
        .map_err(|e| MissionError::unknown(format!("Malformed analysis response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanLevel;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const ANSWER: &str =
        r#"{"summary":"ok","findings":[{"title":"t","description":"d","severity":"low"}]}"#;

    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ProviderResponse, MissionError>>>,
        calls: Mutex<Vec<(Instant, AnalysisRequest)>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ProviderResponse, MissionError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl AnalysisProvider for ScriptedProvider {
        async fn generate(
            &self,
            request: &AnalysisRequest,
        ) -> Result<ProviderResponse, MissionError> {
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MissionError::unknown("script exhausted")))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn ok(usage: Option<TokenUsage>) -> Result<ProviderResponse, MissionError> {
        Ok(ProviderResponse {
            text: ANSWER.to_string(),
            usage,
        })
    }

    fn err(kind: MissionErrorKind) -> Result<ProviderResponse, MissionError> {
        Err(MissionError::new(kind, format!("{kind} failure")))
    }

    fn gateway(provider: Arc<ScriptedProvider>) -> AiGateway {
        AiGateway::new(
            provider,
            Arc::new(CooldownGate::new(Duration::from_millis(2500))),
            RetryPolicy::default(),
        )
    }

    fn context(level: ScanLevel) -> AnalysisContext {
        AnalysisContext {
            target_url: "https://example.com/".to_string(),
            level,
            language: "en".to_string(),
            page_title: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let provider = ScriptedProvider::new(vec![ok(Some(TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
            thinking_tokens: 0,
        }))]);
        let gw = gateway(Arc::clone(&provider));
        let outcome = gw
            .analyze(&[], &[], &context(ScanLevel::Fast))
            .await
            .unwrap();

        assert_eq!(outcome.analysis.summary, "ok");
        assert_eq!(outcome.usage.attempts, 1);
        assert_eq!(outcome.usage.total_tokens, 120);
        assert!(!outcome.usage.estimated);
        assert_eq!(gw.totals().snapshot().prompt_tokens, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_stops_at_five_attempts() {
        let provider = ScriptedProvider::new(
            (0..10).map(|_| err(MissionErrorKind::RateLimit)).collect(),
        );
        let gw = gateway(Arc::clone(&provider));
        let mut retries = 0;
        let error = gw
            .analyze_with(&[], &[], &context(ScanLevel::Standard), |e| {
                if matches!(e, GatewayEvent::Retrying { .. }) {
                    retries += 1;
                }
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind, MissionErrorKind::RateLimit);
        assert_eq!(provider.call_times().len(), 5);
        assert_eq!(retries, 4);
        assert_eq!(gw.totals().snapshot().attempts, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_error_is_last_attempts_kind() {
        let provider = ScriptedProvider::new(vec![
            err(MissionErrorKind::RateLimit),
            err(MissionErrorKind::RateLimit),
            err(MissionErrorKind::ServiceBusy),
            err(MissionErrorKind::RateLimit),
            err(MissionErrorKind::ServiceBusy),
        ]);
        let error = gateway(Arc::clone(&provider))
            .analyze(&[], &[], &context(ScanLevel::Fast))
            .await
            .unwrap_err();
        assert_eq!(error.kind, MissionErrorKind::ServiceBusy);
        assert_eq!(provider.call_times().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_fails_immediately() {
        for kind in [
            MissionErrorKind::ApiKey,
            MissionErrorKind::Network,
            MissionErrorKind::Unknown,
        ] {
            let provider = ScriptedProvider::new(vec![err(kind), ok(None)]);
            let error = gateway(Arc::clone(&provider))
                .analyze(&[], &[], &context(ScanLevel::Fast))
                .await
                .unwrap_err();
            assert_eq!(error.kind, kind);
            assert_eq!(error.message, format!("{kind} failure"));
            assert_eq!(provider.call_times().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_backoff_and_gate() {
        let provider =
            ScriptedProvider::new(vec![err(MissionErrorKind::ServiceBusy), ok(None)]);
        let started = Instant::now();
        let outcome = gateway(Arc::clone(&provider))
            .analyze(&[], &[], &context(ScanLevel::Fast))
            .await
            .unwrap();

        let times = provider.call_times();
        assert_eq!(times.len(), 2);
        let gap = times[1] - times[0];
        assert!(gap >= Duration::from_secs(5));
        assert!(gap <= Duration::from_millis(7000));
        assert_eq!(outcome.usage.attempts, 2);
        assert!(outcome.usage.estimated);
        assert_eq!(outcome.usage.elapsed_ms, (times[1] - started).as_millis() as u64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_missions_share_the_gate() {
        let gate = Arc::new(CooldownGate::new(Duration::from_millis(2500)));
        let provider = ScriptedProvider::new(vec![ok(None), ok(None), ok(None)]);
        let mut handles = Vec::new();
        for _ in 0..3 {
            let gw = AiGateway::new(
                Arc::clone(&provider) as Arc<dyn AnalysisProvider>,
                Arc::clone(&gate),
                RetryPolicy::default(),
            );
            handles.push(tokio::spawn(async move {
                gw.analyze(&[], &[], &context(ScanLevel::Fast)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut times = provider.call_times();
        times.sort();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deep_request_carries_thinking_budget() {
        let provider = ScriptedProvider::new(vec![ok(None)]);
        gateway(Arc::clone(&provider))
            .analyze(&[], &[], &context(ScanLevel::Deep))
            .await
            .unwrap();
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].1.thinking_budget, Some(32_768));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_answer_is_unknown() {
        let provider = ScriptedProvider::new(vec![Ok(ProviderResponse {
            text: "not json".to_string(),
            usage: None,
        })]);
        let error = gateway(provider)
            .analyze(&[], &[], &context(ScanLevel::Fast))
            .await
            .unwrap_err();
        assert_eq!(error.kind, MissionErrorKind::Unknown);
    }

    #[test]
    fn test_parse_analysis_strips_code_fence() {
        let fenced = format!("```json\n{ANSWER}\n```");
        assert_eq!(parse_analysis(&fenced).unwrap().findings.len(), 1);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }
}
