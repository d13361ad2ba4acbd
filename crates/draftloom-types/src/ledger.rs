use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::worker::WorkerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLedgerEntry {
    pub user_id: String,
    pub worker_kind: WorkerKind,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub monthly_budget_usd: f64,
    pub current_spend_usd: f64,
    pub remaining_usd: f64,
    pub percent_used: f64,
    pub approaching_limit: bool,
    pub over_budget: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsageStats {
    pub total_cost: f64,
    pub total_requests: u64,
    pub by_worker: HashMap<WorkerKind, f64>,
    pub by_model: HashMap<String, f64>,
}
