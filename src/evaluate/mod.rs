// src/evaluate/mod.rs
pub mod backend;
mod parse;

pub use backend::{ScoreBackend, ScriptedBackend, StaticBackend};

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::BackendError;
use crate::item::Item;
use crate::throttle::{RateGate, RetryPolicy};

/// Scoring outcome for a single item. `score: None` records a backend or
/// parse failure for this item without failing the batch.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub item: Item,
    pub score: Option<f64>,
    /// Name of the backend that answered; None when the whole chain failed.
    pub provider_used: Option<String>,
    pub error: Option<String>,
}

impl EvaluationResult {
    /// True when the item scored at or above the caller's cutoff.
    pub fn passes(&self, threshold: f64) -> bool {
        self.score.map(|s| s >= threshold).unwrap_or(false)
    }
}

struct BackendSlot {
    backend: Arc<dyn ScoreBackend>,
    gate: RateGate,
}

/// Batched scoring with an ordered backend fallback chain.
///
/// Chunks are scored strictly sequentially; within a chunk the chain is
/// walked in order, each backend getting bounded retries with exponential
/// backoff behind its own token-bucket gate. Total backend unavailability
/// degrades scores to None, it never fails the caller.
pub struct Evaluator {
    backends: Vec<BackendSlot>,
    retry: RetryPolicy,
}

impl Evaluator {
    /// `calls_per_second: None` disables rate limiting. Each backend gets
    /// its own bucket, shared across all chunks and calls.
    pub fn new(
        chain: Vec<Arc<dyn ScoreBackend>>,
        retry: RetryPolicy,
        calls_per_second: Option<u32>,
    ) -> Self {
        let backends = chain
            .into_iter()
            .map(|backend| BackendSlot {
                gate: match calls_per_second {
                    Some(cps) => RateGate::per_second(cps),
                    None => RateGate::unlimited(),
                },
                backend,
            })
            .collect();
        Self { backends, retry }
    }

    /// Build from config: order `available` by `llm.fallback_chain` and
    /// apply the `rate_limiting` section.
    pub fn from_config(available: Vec<Arc<dyn ScoreBackend>>, cfg: &Config) -> Self {
        let chain = chain_from_config(available, &cfg.llm.fallback_chain);
        let retry = RetryPolicy::from_config(&cfg.rate_limiting);
        let cps = cfg
            .rate_limiting
            .enabled
            .then_some(cfg.rate_limiting.calls_per_second);
        Self::new(chain, retry, cps)
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Score `items` in consecutive chunks of `batch_size` (at least 1).
    /// Always returns exactly one result per item, in input order.
    pub async fn batch_evaluate(
        &self,
        items: &[Item],
        criteria: &str,
        batch_size: usize,
    ) -> Vec<EvaluationResult> {
        crate::metrics::describe_metrics();

        let size = batch_size.max(1);
        let mut out = Vec::with_capacity(items.len());

        for chunk in items.chunks(size) {
            counter!("evaluate_chunks_total").increment(1);
            match self.score_chunk(chunk, criteria).await {
                Ok((raw, backend_name)) => match parse::parse_scores(&raw, chunk.len()) {
                    Ok(scores) => {
                        for (item, score) in chunk.iter().zip(scores) {
                            if score.is_none() {
                                counter!("evaluate_parse_failures_total").increment(1);
                            }
                            out.push(EvaluationResult {
                                item: item.clone(),
                                score,
                                provider_used: Some(backend_name.clone()),
                                error: score
                                    .is_none()
                                    .then(|| "no usable score in backend response".to_string()),
                            });
                        }
                    }
                    Err(e) => {
                        counter!("evaluate_parse_failures_total").increment(chunk.len() as u64);
                        warn!(backend = %backend_name, error = %e, "unparseable scoring response");
                        for item in chunk {
                            out.push(EvaluationResult {
                                item: item.clone(),
                                score: None,
                                provider_used: Some(backend_name.clone()),
                                error: Some(e.to_string()),
                            });
                        }
                    }
                },
                Err(reason) => {
                    for item in chunk {
                        out.push(EvaluationResult {
                            item: item.clone(),
                            score: None,
                            provider_used: None,
                            error: Some(reason.clone()),
                        });
                    }
                }
            }
        }

        debug_assert_eq!(out.len(), items.len());
        out
    }

    /// Walk the chain for one chunk. Ok carries (raw response, backend name).
    async fn score_chunk(&self, chunk: &[Item], criteria: &str) -> Result<(String, String), String> {
        if self.backends.is_empty() {
            return Err("no scoring backends configured".to_string());
        }
        let mut failures: Vec<String> = Vec::new();
        for (pos, slot) in self.backends.iter().enumerate() {
            if pos > 0 {
                counter!("evaluate_fallback_total").increment(1);
            }
            match self.try_backend(slot, chunk, criteria).await {
                Ok(raw) => return Ok((raw, slot.backend.name().to_string())),
                Err(e) => {
                    warn!(backend = slot.backend.name(), error = %e, "backend failed for chunk");
                    failures.push(format!("{}: {}", slot.backend.name(), e));
                }
            }
        }
        Err(format!("all scoring backends failed: {}", failures.join("; ")))
    }

    /// One backend, bounded retries. Permanent errors end the attempts early.
    async fn try_backend(
        &self,
        slot: &BackendSlot,
        chunk: &[Item],
        criteria: &str,
    ) -> Result<String, BackendError> {
        let mut attempt = 0u32;
        loop {
            slot.gate.acquire().await;
            let started = Instant::now();
            let result = slot.backend.score_batch(chunk, criteria).await;
            histogram!("evaluate_backend_ms").record(started.elapsed().as_millis() as f64);
            match result {
                Ok(raw) => return Ok(raw),
                Err(e) => {
                    counter!("evaluate_backend_errors_total").increment(1);
                    attempt += 1;
                    if !e.is_transient() || attempt >= self.retry.attempts {
                        return Err(e);
                    }
                    let delay = self.retry.delay_for(attempt - 1);
                    debug!(
                        backend = slot.backend.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying backend"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Order `available` backends by the configured chain, dropping names the
/// chain does not mention. A chain that matches nothing falls back to
/// registration order so a typo degrades loudly instead of scoring nothing.
pub fn chain_from_config(
    available: Vec<Arc<dyn ScoreBackend>>,
    chain: &[String],
) -> Vec<Arc<dyn ScoreBackend>> {
    if chain.is_empty() {
        return available;
    }
    let mut pool: Vec<Option<Arc<dyn ScoreBackend>>> = available.into_iter().map(Some).collect();
    let mut ordered = Vec::new();
    for name in chain {
        let slot = pool
            .iter_mut()
            .find(|s| s.as_ref().map(|b| b.name() == name).unwrap_or(false));
        match slot {
            Some(s) => ordered.push(s.take().expect("slot checked above")),
            None => debug!(backend = %name, "configured backend not available"),
        }
    }
    let unused: Vec<_> = pool.into_iter().flatten().collect();
    if ordered.is_empty() && !unused.is_empty() {
        warn!("fallback chain matched no available backend, using registration order");
        return unused;
    }
    for b in &unused {
        debug!(backend = b.name(), "backend not in fallback chain, unused");
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_orders_and_filters_backends() {
        let a: Arc<dyn ScoreBackend> = Arc::new(ScriptedBackend::new("a"));
        let b: Arc<dyn ScoreBackend> = Arc::new(ScriptedBackend::new("b"));
        let c: Arc<dyn ScoreBackend> = Arc::new(ScriptedBackend::new("c"));
        let chain = vec!["c".to_string(), "a".to_string(), "missing".to_string()];
        let ordered = chain_from_config(vec![a, b, c], &chain);
        let names: Vec<&str> = ordered.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn unmatched_chain_falls_back_to_registration_order() {
        let a: Arc<dyn ScoreBackend> = Arc::new(ScriptedBackend::new("a"));
        let ordered = chain_from_config(vec![a], &["nope".to_string()]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].name(), "a");
    }

    #[test]
    fn passes_requires_a_score_at_threshold() {
        let item = Item::new("1", "t", "https://x.com/1", "");
        let hit = EvaluationResult {
            item: item.clone(),
            score: Some(0.7),
            provider_used: Some("static".to_string()),
            error: None,
        };
        let miss = EvaluationResult {
            item: item.clone(),
            score: Some(0.69),
            provider_used: Some("static".to_string()),
            error: None,
        };
        let failed = EvaluationResult {
            item,
            score: None,
            provider_used: None,
            error: Some("x".to_string()),
        };
        assert!(hit.passes(0.7));
        assert!(!miss.passes(0.7));
        assert!(!failed.passes(0.0));
    }
}
