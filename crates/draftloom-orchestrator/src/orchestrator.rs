use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use draftloom_context::ContextStore;
use draftloom_resilience::{CostLedger, RateLimiter};
use draftloom_router::Router;
use draftloom_types::{
    Context, OrchestratorConfig, OrchestratorError, PhaseStatus, PhaseSummary, ProjectStatus, RateLimitReason,
    Request, RequestType, Response, RoutingContext, WorkerKind,
};
use draftloom_workers::WorkerRegistry;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// Rolling metrics kept under a single lock, updated on every exit path of
/// `process`.
#[derive(Default)]
struct MetricsState {
    inner: draftloom_types::Metrics,
}

impl MetricsState {
    fn record(&mut self, worker: Option<WorkerKind>, outcome: &Result<Response, OrchestratorError>, elapsed_ms: u64) {
        self.inner.total_requests += 1;
        match outcome {
            Ok(_) => self.inner.successful_requests += 1,
            Err(err) => {
                self.inner.failed_requests += 1;
                *self.inner.per_error_kind.entry(err.kind().to_string()).or_insert(0) += 1;
            }
        }
        if let Some(kind) = worker {
            *self.inner.per_worker.entry(kind).or_insert(0) += 1;
        }

        const EMA_ALPHA: f64 = 0.2;
        self.inner.avg_processing_time_ms = if self.inner.total_requests == 1 {
            elapsed_ms as f64
        } else {
            EMA_ALPHA * elapsed_ms as f64 + (1.0 - EMA_ALPHA) * self.inner.avg_processing_time_ms
        };
    }
}

/// Coordinates admission control, routing, context enrichment and worker
/// dispatch for one request. Locks are taken in the fixed order
/// breaker -> limiter -> cache -> context -> metrics; this struct never holds
/// more than one of its own locks across an `.await` on a worker call.
pub struct Orchestrator {
    config: OrchestratorConfig,
    router: Arc<Router>,
    workers: WorkerRegistry,
    context_store: Arc<ContextStore>,
    rate_limiter: Arc<RateLimiter>,
    ledger: Arc<CostLedger>,
    admission: Arc<Semaphore>,
    metrics: Mutex<MetricsState>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        router: Arc<Router>,
        workers: WorkerRegistry,
        context_store: Arc<ContextStore>,
        rate_limiter: Arc<RateLimiter>,
        ledger: Arc<CostLedger>,
    ) -> Self {
        let admission = Arc::new(Semaphore::new(config.max_concurrent_requests));
        Self {
            config,
            router,
            workers,
            context_store,
            rate_limiter,
            ledger,
            admission,
            metrics: Mutex::new(MetricsState::default()),
        }
    }

    pub async fn process(&self, request: Request) -> Result<Response, OrchestratorError> {
        let started = std::time::Instant::now();
        let outcome = self.process_inner(&request, started).await;

        let worker = outcome.as_ref().ok().and_then(|_| request.preferred_worker);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.lock().await.record(worker, &outcome, elapsed_ms);
        outcome
    }

    async fn process_inner(&self, request: &Request, started: std::time::Instant) -> Result<Response, OrchestratorError> {
        let Ok(_permit) = self.admission.clone().try_acquire_owned() else {
            return Err(OrchestratorError::RateLimited {
                reason: RateLimitReason::Window,
                retry_after_ms: 250,
            });
        };

        self.rate_limiter.check(&request.user_id).await?;

        if self
            .ledger
            .would_exceed_daily_cap(&request.user_id, self.config.max_daily_cost_usd, 0.0)
            .await
        {
            return Err(OrchestratorError::RateLimited {
                reason: RateLimitReason::DailyBudget,
                retry_after_ms: 0,
            });
        }

        let conversation_id = request.conversation_id.clone().unwrap_or_else(|| "default".to_string());
        let context = self.context_store.get(&request.project_id, &conversation_id).await;

        let routing_ctx = self.build_routing_context(request, &context);
        let healthy: Vec<(WorkerKind, bool)> = {
            let mut statuses = Vec::with_capacity(WorkerKind::ALL.len());
            for kind in WorkerKind::ALL {
                statuses.push((kind, self.workers.is_healthy(kind).await));
            }
            statuses
        };

        let Some(selected) = self
            .router
            .route(&routing_ctx, |kind| healthy.iter().any(|(k, ok)| *k == kind && *ok))
        else {
            return Err(OrchestratorError::NoAgentAvailable);
        };

        let Some(worker) = self.workers.get(selected) else {
            return Err(OrchestratorError::NoAgentAvailable);
        };

        worker.validate(request)?;

        let cancel = CancellationToken::new();
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        let response = match tokio::time::timeout(timeout, worker.process(request, &context, cancel.clone())).await {
            Ok(result) => result?,
            Err(_) => {
                cancel.cancel();
                return Err(OrchestratorError::Timeout {
                    worker: selected,
                    timeout_ms: self.config.request_timeout_ms,
                });
            }
        };

        self.persist_phase(request, &conversation_id, context, selected, &response).await;

        tracing::debug!(
            worker = %selected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request processed"
        );
        Ok(response)
    }

    fn build_routing_context(&self, request: &Request, context: &Context) -> RoutingContext {
        let last_worker = context.last_worker();
        let current_phase = request.preferred_worker.or(last_worker);

        let request_type = if request.conversation_id.is_none() || context.previous_phases.is_empty() {
            RequestType::NewConversation
        } else if request.preferred_worker.is_some() && request.preferred_worker != last_worker {
            RequestType::PhaseTransition
        } else {
            RequestType::ContinueConversation
        };

        RoutingContext {
            current_phase,
            project_status: ProjectStatus {
                active_phase: last_worker,
                phase_count: context.previous_phases.len(),
            },
            previous_phases: context.previous_phases.clone(),
            content_length: request.content_length(),
            last_worker,
            request_type,
            user_preferences: context.user_preferences.clone(),
        }
    }

    /// Appends the completed phase to context and persists it. Best-effort:
    /// `ContextStore::set` never fails the caller, it only logs.
    async fn persist_phase(
        &self,
        request: &Request,
        conversation_id: &str,
        mut context: Context,
        worker: WorkerKind,
        response: &Response,
    ) {
        context.push_completed_phase(PhaseSummary {
            worker_kind: worker,
            status: PhaseStatus::Completed,
            outputs: response.phase_outputs.clone(),
            summary: Some(response.content.chars().take(200).collect()),
            completed_at: Utc::now(),
        });
        self.context_store.set(&request.project_id, conversation_id, context).await;
    }

    pub fn add_routing_rule(&self, rule: draftloom_router::RoutingRule) {
        self.router.add_rule(rule);
    }

    pub fn remove_routing_rule(&self, description: &str) {
        self.router.remove_rule(description);
    }

    pub async fn metrics(&self) -> draftloom_types::Metrics {
        self.metrics.lock().await.inner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloom_context::InMemoryPersistence;
    use draftloom_providers::{ProviderRegistry, ProvidersConfig, WorkerClient};
    use draftloom_resilience::{CircuitBreakerRegistry, ResponseCache};
    use draftloom_types::{CacheTtlConfig, CircuitBreakerConfig, RetryConfig};
    use draftloom_workers::PromptWorker;

    fn build() -> Orchestrator {
        let config = OrchestratorConfig::default();
        let router = Arc::new(Router::new(WorkerKind::Ideation));

        let client = Arc::new(WorkerClient::new(
            ProviderRegistry::new(ProvidersConfig::default()),
            ResponseCache::new(),
            CircuitBreakerRegistry::new(CircuitBreakerConfig::default()),
            Arc::new(CostLedger::new(config.monthly_budget_usd)),
            RetryConfig::default(),
            CacheTtlConfig::default(),
            Duration::from_secs(5),
            config.usd_per_token,
        ));

        let mut workers = WorkerRegistry::new();
        workers.register(Arc::new(PromptWorker::new(
            WorkerKind::Ideation,
            config.max_context_length,
            "local-echo",
            None,
            client,
        )));

        let context_store = Arc::new(ContextStore::new(
            config.context_cache_size,
            Duration::from_millis(config.context_ttl_ms),
            Arc::new(InMemoryPersistence::default()),
        ));

        Orchestrator::new(
            config.clone(),
            router,
            workers,
            context_store,
            Arc::new(RateLimiter::new(Duration::from_secs(60), config.max_requests_per_minute)),
            Arc::new(CostLedger::new(config.monthly_budget_usd)),
        )
    }

    fn request() -> Request {
        Request {
            user_id: "u1".to_string(),
            project_id: "p1".to_string(),
            conversation_id: None,
            content: "give me three blog post ideas".to_string(),
            preferred_worker: Some(WorkerKind::Ideation),
            options: Default::default(),
        }
    }

    #[tokio::test]
    async fn process_routes_to_healthy_worker_and_records_metrics() {
        let orchestrator = build();
        let response = orchestrator.process(request()).await.unwrap();
        assert!(response.content.contains("blog post ideas"));

        let metrics = orchestrator.metrics().await;
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
    }

    #[tokio::test]
    async fn process_fails_validation_for_empty_content() {
        let orchestrator = build();
        let mut req = request();
        req.content = "   ".to_string();
        let err = orchestrator.process(req).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn process_returns_no_agent_available_when_no_rule_matches() {
        let orchestrator = build();
        let mut req = request();
        req.preferred_worker = Some(WorkerKind::Media);
        let err = orchestrator.process(req).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NoAgentAvailable));
    }

    #[tokio::test]
    async fn repeated_requests_beyond_the_per_minute_cap_are_rate_limited() {
        let config = OrchestratorConfig {
            max_requests_per_minute: 1,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(
            config.clone(),
            Arc::new(Router::new(WorkerKind::Ideation)),
            {
                let client = Arc::new(WorkerClient::new(
                    ProviderRegistry::new(ProvidersConfig::default()),
                    ResponseCache::new(),
                    CircuitBreakerRegistry::new(CircuitBreakerConfig::default()),
                    Arc::new(CostLedger::new(config.monthly_budget_usd)),
                    RetryConfig::default(),
                    CacheTtlConfig::default(),
                    Duration::from_secs(5),
                    config.usd_per_token,
                ));
                let mut workers = WorkerRegistry::new();
                workers.register(Arc::new(PromptWorker::new(
                    WorkerKind::Ideation,
                    config.max_context_length,
                    "local-echo",
                    None,
                    client,
                )));
                workers
            },
            Arc::new(ContextStore::new(
                config.context_cache_size,
                Duration::from_millis(config.context_ttl_ms),
                Arc::new(InMemoryPersistence::default()),
            )),
            Arc::new(RateLimiter::new(Duration::from_secs(60), 1)),
            Arc::new(CostLedger::new(config.monthly_budget_usd)),
        );

        orchestrator.process(request()).await.unwrap();
        let err = orchestrator.process(request()).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::RateLimited {
                reason: RateLimitReason::Window,
                ..
            }
        ));
    }
}
