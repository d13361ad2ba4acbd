use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::worker::WorkerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub monitoring_window_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            monitoring_window_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    pub ideation_ms: u64,
    pub refiner_ms: u64,
    pub media_ms: u64,
    pub factchecker_ms: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            ideation_ms: 5 * 60_000,
            refiner_ms: 30 * 60_000,
            media_ms: 60 * 60_000,
            factchecker_ms: 5 * 60_000,
        }
    }
}

impl CacheTtlConfig {
    pub fn for_worker(&self, kind: WorkerKind) -> u64 {
        match kind {
            WorkerKind::Ideation => self.ideation_ms,
            WorkerKind::Refiner => self.refiner_ms,
            WorkerKind::Media => self.media_ms,
            WorkerKind::Factchecker => self.factchecker_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_concurrent_requests: usize,
    pub request_timeout_ms: u64,
    pub context_cache_size: usize,
    pub context_ttl_ms: u64,
    pub max_requests_per_minute: u32,
    pub max_daily_cost_usd: f64,
    pub monthly_budget_usd: f64,
    pub usd_per_token: f64,
    pub retries: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache_ttl: CacheTtlConfig,
    pub fallback_worker: WorkerKind,
    #[serde(default)]
    pub trusted_domains: HashMap<String, f64>,
    pub shutdown_drain_ms: u64,
    pub log_retention_days: u64,
    #[serde(default)]
    pub max_context_length: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            request_timeout_ms: 30_000,
            context_cache_size: 100,
            context_ttl_ms: 24 * 60 * 60 * 1000,
            max_requests_per_minute: 20,
            max_daily_cost_usd: 10.0,
            monthly_budget_usd: 100.0,
            usd_per_token: 0.000_002,
            retries: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache_ttl: CacheTtlConfig::default(),
            fallback_worker: WorkerKind::Ideation,
            trusted_domains: HashMap::new(),
            shutdown_drain_ms: 10_000,
            log_retention_days: 14,
            max_context_length: 12_000,
        }
    }
}

impl OrchestratorConfig {
    /// Shallow-merges a JSON object onto this config, field by field, matching the
    /// precedence order defaults -> file -> env -> cli described by the loader.
    pub fn merge_override(mut self, value: serde_json::Value) -> anyhow::Result<Self> {
        let mut base = serde_json::to_value(&self)?;
        if let (Some(base_map), serde_json::Value::Object(override_map)) =
            (base.as_object_mut(), value)
        {
            for (key, v) in override_map {
                base_map.insert(key, v);
            }
        }
        Ok(serde_json::from_value(base)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_concurrent_requests, 10);
        assert_eq!(cfg.retries.max_retries, 3);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn merge_override_replaces_only_named_fields() {
        let cfg = OrchestratorConfig::default();
        let merged = cfg
            .merge_override(serde_json::json!({ "max_concurrent_requests": 42 }))
            .unwrap();
        assert_eq!(merged.max_concurrent_requests, 42);
        assert_eq!(merged.monthly_budget_usd, 100.0);
    }
}
