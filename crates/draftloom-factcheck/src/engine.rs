use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use draftloom_providers::ProviderRegistry;
use draftloom_resilience::CircuitBreakerRegistry;
use draftloom_types::{
    CircuitBreakerConfig, FactCheckPhaseOutput, FactCheckResult, FactCheckStatus, Response, ResponseMetadata,
    SourceReference, TokenUsage,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::analysis::analyze_claim;
use crate::conflicts::detect_conflict;
use crate::credibility::{extract_domain, score_domain, score_relevance};
use crate::search::{build_query, SearchClient};
use crate::seo::suggest;

const INTER_CLAIM_DELAY_MS: u64 = 500;
const CLAIM_CACHE_TTL_HOURS: i64 = 24;

/// Ties claim extraction, search, credibility scoring, analysis, conflict
/// detection and SEO suggestion together. `run` never fails: every substage
/// degrades to a heuristic rather than propagating an error, so a caller can
/// always surface a usable `Response`.
pub struct FactCheckEngine {
    providers: ProviderRegistry,
    search: SearchClient,
    credibility_overrides: HashMap<String, f64>,
    claim_cache: Mutex<HashMap<String, (FactCheckResult, DateTime<Utc>)>>,
}

impl FactCheckEngine {
    pub fn new(
        providers: ProviderRegistry,
        commercial_api_key: Option<String>,
        breaker_config: CircuitBreakerConfig,
        credibility_overrides: HashMap<String, f64>,
    ) -> Self {
        Self {
            providers,
            search: SearchClient::new(CircuitBreakerRegistry::new(breaker_config), commercial_api_key),
            credibility_overrides,
            claim_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(&self, _user_id: &str, content: &str, cancel: CancellationToken) -> Response {
        let started = Instant::now();
        let claims = crate::claims::extract_claims(&self.providers, content).await;

        if claims.is_empty() {
            return Response {
                content: "No factual claims were detected in this draft.".to_string(),
                suggestions: Vec::new(),
                metadata: ResponseMetadata {
                    processing_time_ms: elapsed_ms(started),
                    token_usage: TokenUsage::default(),
                    cost_usd: 0.0,
                    model: "draftloom-factcheck".to_string(),
                    confidence: 1.0,
                    next_steps: Vec::new(),
                },
                phase_outputs: None,
            };
        }

        let mut results = Vec::with_capacity(claims.len());
        for (idx, claim) in claims.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let result = self.resolve_claim(claim).await;
            results.push(result);

            if idx + 1 < claims.len() {
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(INTER_CLAIM_DELAY_MS)) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }

        let conflicts = results.iter().filter_map(detect_conflict).collect::<Vec<_>>();
        let seo_suggestions = suggest(&self.providers, content, &results).await;

        let verified = results.iter().filter(|r| r.status == FactCheckStatus::Verified).count();
        let confidence = if results.is_empty() {
            1.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };

        let summary = format!(
            "Checked {} claim(s): {} verified, {} flagged for review, {} SEO suggestion(s).",
            results.len(),
            verified,
            conflicts.len(),
            seo_suggestions.len()
        );

        let output = FactCheckPhaseOutput {
            claims: claims.clone(),
            fact_check_results: results,
            conflicts,
            seo_suggestions: seo_suggestions.clone(),
        };

        Response {
            content: summary,
            suggestions: seo_suggestions.iter().map(|s| s.title.clone()).collect(),
            metadata: ResponseMetadata {
                processing_time_ms: elapsed_ms(started),
                token_usage: TokenUsage::default(),
                cost_usd: 0.0,
                model: "draftloom-factcheck".to_string(),
                confidence,
                next_steps: Vec::new(),
            },
            phase_outputs: serde_json::to_value(&output).ok(),
        }
    }

    async fn resolve_claim(&self, claim: &draftloom_types::FactualClaim) -> FactCheckResult {
        let cache_key = normalize_claim(&claim.text);
        if let Some(cached) = self.cached_result(&cache_key).await {
            return FactCheckResult {
                claim_id: claim.id,
                ..cached
            };
        }

        let query = build_query(&claim.text);
        let raw_results = self.search.search(&query).await;
        let sources: Vec<SourceReference> = raw_results
            .into_iter()
            .map(|raw| {
                let domain = extract_domain(&raw.url);
                SourceReference {
                    credibility: score_domain(&domain, &self.credibility_overrides),
                    relevance: score_relevance(&claim.text, &raw.snippet),
                    title: raw.title,
                    url: raw.url,
                    domain,
                    snippet: raw.snippet,
                    publish_date: None,
                }
            })
            .collect();

        let result = analyze_claim(&self.providers, claim, &sources).await;
        self.claim_cache
            .lock()
            .await
            .insert(cache_key, (result.clone(), Utc::now()));
        result
    }

    async fn cached_result(&self, key: &str) -> Option<FactCheckResult> {
        let cache = self.claim_cache.lock().await;
        let (result, cached_at) = cache.get(key)?;
        if Utc::now() - *cached_at > ChronoDuration::hours(CLAIM_CACHE_TTL_HOURS) {
            return None;
        }
        Some(result.clone())
    }
}

fn normalize_claim(text: &str) -> String {
    text.trim().to_lowercase()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloom_providers::ProvidersConfig;

    fn engine() -> FactCheckEngine {
        FactCheckEngine::new(
            ProviderRegistry::new(ProvidersConfig::default()),
            None,
            CircuitBreakerConfig {
                failure_threshold: 3,
                recovery_timeout_ms: 1_000,
                monitoring_window_ms: 60_000,
            },
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn run_never_panics_on_content_without_claims() {
        let engine = engine();
        let response = engine.run("user-1", "I enjoy writing fiction.", CancellationToken::new()).await;
        assert!(response.metadata.confidence > 0.0);
    }

    #[tokio::test]
    async fn run_produces_phase_output_when_claims_are_present() {
        let engine = engine();
        let response = engine
            .run(
                "user-1",
                "The study from 2021 found that 40% of readers prefer short articles.",
                CancellationToken::new(),
            )
            .await;
        assert!(response.phase_outputs.is_some());
    }

    #[tokio::test]
    async fn cancellation_stops_further_claim_processing() {
        let engine = engine();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let response = engine
            .run(
                "user-1",
                "The study from 2021 found that 40% of readers prefer short articles. The treaty was signed in 1919.",
                cancel,
            )
            .await;
        assert!(response.metadata.processing_time_ms < 1000);
    }
}
