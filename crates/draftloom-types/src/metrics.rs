use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::worker::WorkerKind;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub per_worker: HashMap<WorkerKind, u64>,
    pub per_error_kind: HashMap<String, u64>,
    pub avg_processing_time_ms: f64,
}
