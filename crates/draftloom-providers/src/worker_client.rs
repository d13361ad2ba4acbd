use std::sync::Arc;
use std::time::{Duration, Instant};

use draftloom_resilience::{synthesize_entry, CircuitBreakerRegistry, CostLedger, Fingerprint, ResponseCache};
use draftloom_types::{
    CacheTtlConfig, OrchestratorError, Response, ResponseMetadata, RetryConfig, WorkerKind,
};
use tokio_util::sync::CancellationToken;

use crate::provider::{ChatCompletionRequest, ChatMessage, ProviderRegistry};

pub struct DispatchRequest<'a> {
    pub worker_kind: WorkerKind,
    pub user_id: &'a str,
    pub request_id: &'a str,
    pub provider_id: Option<&'a str>,
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub relevant_context_digest: &'a str,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Dispatches a chat-completion call for one worker role with cache, circuit
/// breaking, timeout, and bounded exponential-backoff retries, matching the
/// resilience pipeline the resilience crate's primitives are assembled to form.
pub struct WorkerClient {
    registry: ProviderRegistry,
    cache: ResponseCache,
    breakers: CircuitBreakerRegistry,
    ledger: Arc<CostLedger>,
    retries: RetryConfig,
    cache_ttl: CacheTtlConfig,
    request_timeout: Duration,
    usd_per_token: f64,
}

impl WorkerClient {
    pub fn new(
        registry: ProviderRegistry,
        cache: ResponseCache,
        breakers: CircuitBreakerRegistry,
        ledger: Arc<CostLedger>,
        retries: RetryConfig,
        cache_ttl: CacheTtlConfig,
        request_timeout: Duration,
        usd_per_token: f64,
    ) -> Self {
        Self {
            registry,
            cache,
            breakers,
            ledger,
            retries,
            cache_ttl,
            request_timeout,
            usd_per_token,
        }
    }

    pub async fn dispatch(
        &self,
        req: DispatchRequest<'_>,
        cancel: CancellationToken,
    ) -> Result<Response, OrchestratorError> {
        let fingerprint = Fingerprint {
            worker_kind: req.worker_kind,
            model: req.model,
            system_prompt: req.system_prompt,
            user_prompt: req.user_prompt,
            temperature_bits: req.temperature.unwrap_or(0.0).to_bits(),
            max_tokens: req.max_tokens,
            relevant_context_digest: req.relevant_context_digest,
        }
        .compute();

        if let Some(cached) = self.cache.get(&fingerprint).await {
            return Ok(cached);
        }

        let dependency = format!("llm:{}", req.provider_id.unwrap_or("default"));
        let circuit = self.breakers.circuit(&dependency).await;

        let start = Instant::now();
        let mut attempt: u32 = 0;
        let mut last_error: Option<OrchestratorError> = None;

        loop {
            if !circuit.try_acquire().await {
                return Err(OrchestratorError::CircuitOpen { dependency });
            }
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Timeout {
                    worker: req.worker_kind,
                    timeout_ms: self.request_timeout.as_millis() as u64,
                });
            }

            let call = self.call_provider(&req);
            let outcome = tokio::time::timeout(self.request_timeout, call).await;

            let result = match outcome {
                Ok(inner) => inner,
                Err(_) => {
                    circuit.record_failure().await;
                    return Err(OrchestratorError::Timeout {
                        worker: req.worker_kind,
                        timeout_ms: self.request_timeout.as_millis() as u64,
                    });
                }
            };

            match result {
                Ok(completion) => {
                    circuit.record_success().await;
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    let cost = completion.usage.total_tokens as f64 * self.usd_per_token;
                    let response = Response {
                        content: completion.content,
                        suggestions: Vec::new(),
                        metadata: ResponseMetadata {
                            processing_time_ms: elapsed_ms,
                            token_usage: completion.usage,
                            cost_usd: cost,
                            model: req.model.to_string(),
                            confidence: 0.85,
                            next_steps: Vec::new(),
                        },
                        phase_outputs: None,
                    };

                    self.cache
                        .set(
                            fingerprint.clone(),
                            response.clone(),
                            self.cache_ttl.for_worker(req.worker_kind),
                        )
                        .await;

                    self.ledger
                        .record(synthesize_entry(
                            req.user_id,
                            req.worker_kind,
                            req.model,
                            completion.usage.prompt_tokens,
                            completion.usage.completion_tokens,
                            self.usd_per_token,
                            req.request_id,
                        ))
                        .await;

                    return Ok(response);
                }
                Err(err) => {
                    circuit.record_failure().await;
                    let retryable = is_retryable(&err);
                    last_error = Some(OrchestratorError::UpstreamError {
                        message: err.to_string(),
                        retryable,
                    });

                    if !retryable || attempt >= self.retries.max_retries {
                        break;
                    }

                    let delay_ms = ((self.retries.base_delay_ms as f64)
                        * self.retries.factor.powi(attempt as i32))
                    .min(self.retries.max_delay_ms as f64) as u64;
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }

        Err(OrchestratorError::WorkerCallFailed {
            worker: req.worker_kind,
            attempts: attempt + 1,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Reports whether the LLM dependency behind `provider_id` is currently
    /// accepting calls (its circuit breaker is not `open`).
    pub async fn is_dependency_healthy(&self, provider_id: Option<&str>) -> bool {
        let dependency = format!("llm:{}", provider_id.unwrap_or("default"));
        self.breakers.circuit(&dependency).await.try_acquire().await
    }

    async fn call_provider(
        &self,
        req: &DispatchRequest<'_>,
    ) -> anyhow::Result<crate::provider::ChatCompletionResponse> {
        self.registry
            .complete(
                req.provider_id,
                &ChatCompletionRequest {
                    model: req.model.to_string(),
                    messages: vec![
                        ChatMessage {
                            role: "system".to_string(),
                            content: req.system_prompt.to_string(),
                        },
                        ChatMessage {
                            role: "user".to_string(),
                            content: req.user_prompt.to_string(),
                        },
                    ],
                    max_tokens: req.max_tokens,
                    temperature: req.temperature,
                },
            )
            .await
    }
}

/// 4xx other than a rate limit are non-retryable; everything else (network
/// errors, 5xx, 429) is retried up to the configured bound.
fn is_retryable(err: &anyhow::Error) -> bool {
    let message = err.to_string();
    if message.contains("status 4") && !message.contains("status 429") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProvidersConfig;
    use draftloom_resilience::CostLedger;
    use draftloom_types::CircuitBreakerConfig;

    fn client() -> WorkerClient {
        WorkerClient::new(
            ProviderRegistry::new(ProvidersConfig::default()),
            ResponseCache::new(),
            CircuitBreakerRegistry::new(CircuitBreakerConfig::default()),
            Arc::new(CostLedger::new(100.0)),
            RetryConfig::default(),
            CacheTtlConfig::default(),
            Duration::from_secs(5),
            0.000_001,
        )
    }

    #[tokio::test]
    async fn dispatch_against_local_provider_succeeds_and_caches() {
        let client = client();
        let req = DispatchRequest {
            worker_kind: WorkerKind::Ideation,
            user_id: "u1",
            request_id: "r1",
            provider_id: None,
            model: "local-echo",
            system_prompt: "you are an ideation assistant",
            user_prompt: "give me blog ideas",
            relevant_context_digest: "none",
            max_tokens: None,
            temperature: None,
        };
        let response = client.dispatch(req, CancellationToken::new()).await.unwrap();
        assert!(response.content.contains("give me blog ideas"));

        let stats = client.ledger.stats("u1").await;
        assert_eq!(stats.total_requests, 1);
    }

    #[tokio::test]
    async fn second_identical_dispatch_is_served_from_cache() {
        let client = client();
        let make_req = || DispatchRequest {
            worker_kind: WorkerKind::Refiner,
            user_id: "u2",
            request_id: "r2",
            provider_id: None,
            model: "local-echo",
            system_prompt: "sys",
            user_prompt: "tighten my draft",
            relevant_context_digest: "digest",
            max_tokens: None,
            temperature: None,
        };
        client.dispatch(make_req(), CancellationToken::new()).await.unwrap();
        client.dispatch(make_req(), CancellationToken::new()).await.unwrap();

        let stats = client.ledger.stats("u2").await;
        assert_eq!(stats.total_requests, 1, "second call should be a cache hit, not a new ledger entry");
    }
}
