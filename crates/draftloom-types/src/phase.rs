use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::worker::WorkerKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: Uuid,
    pub kind: WorkerKind,
    pub status: PhaseStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outputs: Option<serde_json::Value>,
}

impl Phase {
    pub fn new(kind: WorkerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: PhaseStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            outputs: None,
        }
    }

    pub fn activate(&mut self) {
        self.status = PhaseStatus::Active;
    }

    pub fn complete(&mut self, outputs: Option<serde_json::Value>) {
        self.status = PhaseStatus::Completed;
        self.outputs = outputs;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = PhaseStatus::Failed;
        self.completed_at = Some(Utc::now());
    }
}

/// A condensed view of a previously run phase, as carried in `Context.previous_phases`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub worker_kind: WorkerKind,
    pub status: PhaseStatus,
    #[serde(default)]
    pub outputs: Option<serde_json::Value>,
    #[serde(default)]
    pub summary: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_phase_starts_pending() {
        let phase = Phase::new(WorkerKind::Ideation);
        assert_eq!(phase.status, PhaseStatus::Pending);
        assert!(phase.completed_at.is_none());
    }

    #[test]
    fn complete_sets_timestamp_and_status() {
        let mut phase = Phase::new(WorkerKind::Refiner);
        phase.activate();
        phase.complete(None);
        assert_eq!(phase.status, PhaseStatus::Completed);
        assert!(phase.completed_at.is_some());
    }
}
