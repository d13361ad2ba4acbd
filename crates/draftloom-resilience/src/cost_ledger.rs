use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use draftloom_types::{BudgetStatus, CostLedgerEntry, UsageStats, WorkerKind};
use tokio::sync::Mutex;

/// Pluggable durable sink for ledger entries. The in-memory `Vec` this crate keeps
/// is always the source of truth for budget queries within a process lifetime; a
/// sink is an optional mirror for long-term storage.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn append(&self, entry: &CostLedgerEntry) -> anyhow::Result<()>;
}

pub struct NullSink;

#[async_trait]
impl LedgerSink for NullSink {
    async fn append(&self, _entry: &CostLedgerEntry) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct CostLedger {
    monthly_budget_usd: f64,
    entries: Mutex<Vec<CostLedgerEntry>>,
    sink: Arc<dyn LedgerSink>,
}

impl CostLedger {
    pub fn new(monthly_budget_usd: f64) -> Self {
        Self::with_sink(monthly_budget_usd, Arc::new(NullSink))
    }

    pub fn with_sink(monthly_budget_usd: f64, sink: Arc<dyn LedgerSink>) -> Self {
        Self {
            monthly_budget_usd,
            entries: Mutex::new(Vec::new()),
            sink,
        }
    }

    /// Appends a usage entry. A sink failure is logged but never unwinds the
    /// worker call that produced the entry.
    pub async fn record(&self, entry: CostLedgerEntry) {
        if let Err(err) = self.sink.append(&entry).await {
            tracing::warn!(error = %err, "cost ledger sink write failed");
        }
        self.entries.lock().await.push(entry);
    }

    pub async fn status(&self, user_id: &str) -> BudgetStatus {
        let now = Utc::now();
        let spend = self.month_spend(user_id, now).await;
        let percent_used = if self.monthly_budget_usd > 0.0 {
            (spend / self.monthly_budget_usd) * 100.0
        } else {
            0.0
        };
        BudgetStatus {
            monthly_budget_usd: self.monthly_budget_usd,
            current_spend_usd: spend,
            remaining_usd: (self.monthly_budget_usd - spend).max(0.0),
            percent_used,
            approaching_limit: percent_used >= 80.0,
            over_budget: percent_used >= 100.0,
        }
    }

    pub async fn stats(&self, user_id: &str) -> UsageStats {
        let entries = self.entries.lock().await;
        let mut stats = UsageStats::default();
        for entry in entries.iter().filter(|e| e.user_id == user_id) {
            stats.total_cost += entry.cost;
            stats.total_requests += 1;
            *stats.by_worker.entry(entry.worker_kind).or_insert(0.0) += entry.cost;
            *stats.by_model.entry(entry.model.clone()).or_insert(0.0) += entry.cost;
        }
        stats
    }

    async fn month_spend(&self, user_id: &str, now: DateTime<Utc>) -> f64 {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.created_at.year() == now.year()
                    && e.created_at.month() == now.month()
            })
            .map(|e| e.cost)
            .sum()
    }

    pub async fn would_exceed_daily_cap(
        &self,
        user_id: &str,
        daily_cap_usd: f64,
        estimated_cost: f64,
    ) -> bool {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        let today_spend: f64 = entries
            .iter()
            .filter(|e| e.user_id == user_id && e.created_at.date_naive() == now.date_naive())
            .map(|e| e.cost)
            .sum();
        today_spend + estimated_cost > daily_cap_usd
    }
}

pub fn synthesize_entry(
    user_id: &str,
    worker_kind: WorkerKind,
    model: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
    usd_per_token: f64,
    request_id: &str,
) -> CostLedgerEntry {
    let total = prompt_tokens + completion_tokens;
    CostLedgerEntry {
        user_id: user_id.to_string(),
        worker_kind,
        model: model.to_string(),
        prompt_tokens,
        completion_tokens,
        cost: total as f64 * usd_per_token,
        request_id: request_id.to_string(),
        created_at: Utc::now(),
        metadata: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn budget_monotonicity_across_record_calls() {
        let ledger = CostLedger::new(20.0);
        ledger
            .record(synthesize_entry("u1", WorkerKind::Ideation, "gpt", 100, 50, 0.0001, "r1"))
            .await;
        ledger
            .record(synthesize_entry("u1", WorkerKind::Refiner, "gpt", 200, 100, 0.0001, "r2"))
            .await;
        let status = ledger.status("u1").await;
        assert!((status.current_spend_usd - 0.045).abs() < 1e-9);
    }

    #[tokio::test]
    async fn over_budget_flag_trips_at_100_percent() {
        let ledger = CostLedger::new(1.0);
        ledger
            .record(synthesize_entry("u2", WorkerKind::Ideation, "gpt", 1_000_000, 0, 0.000_001, "r1"))
            .await;
        let status = ledger.status("u2").await;
        assert!(status.over_budget);
        assert!(status.approaching_limit);
    }

    #[tokio::test]
    async fn stats_aggregate_by_worker_and_model() {
        let ledger = CostLedger::new(100.0);
        ledger
            .record(synthesize_entry("u3", WorkerKind::Media, "model-a", 10, 10, 0.01, "r1"))
            .await;
        ledger
            .record(synthesize_entry("u3", WorkerKind::Media, "model-a", 10, 10, 0.01, "r2"))
            .await;
        let stats = ledger.stats("u3").await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(*stats.by_worker.get(&WorkerKind::Media).unwrap(), 0.4);
    }
}
