use serde::{Deserialize, Serialize};

use crate::context::UserPreferences;
use crate::phase::PhaseSummary;
use crate::worker::WorkerKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    NewConversation,
    ContinueConversation,
    PhaseTransition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub active_phase: Option<WorkerKind>,
    pub phase_count: usize,
}

/// The derived record the router evaluates rules against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingContext {
    pub current_phase: Option<WorkerKind>,
    pub project_status: ProjectStatus,
    pub previous_phases: Vec<PhaseSummary>,
    pub content_length: usize,
    pub last_worker: Option<WorkerKind>,
    pub request_type: RequestType,
    pub user_preferences: UserPreferences,
}

impl RoutingContext {
    pub fn has_completed(&self, kind: WorkerKind) -> bool {
        self.previous_phases
            .iter()
            .any(|p| p.worker_kind == kind && p.status == crate::phase::PhaseStatus::Completed)
    }
}
