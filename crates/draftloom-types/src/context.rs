use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::PhaseSummary;
use crate::worker::WorkerKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Casual,
    Formal,
    Direct,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_personality")]
    pub personality: Personality,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default = "default_experience")]
    pub experience: ExperienceLevel,
}

fn default_personality() -> Personality {
    Personality::Casual
}

fn default_experience() -> ExperienceLevel {
    ExperienceLevel::Intermediate
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            personality: default_personality(),
            genres: Vec::new(),
            experience: default_experience(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub worker_kind: WorkerKind,
    pub message_count: u32,
    pub last_message_snippet: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleGuide {
    #[serde(default)]
    pub reference_writers: Vec<String>,
    pub tone: String,
    pub target_audience: String,
    pub example_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Context {
    #[serde(default)]
    pub previous_phases: Vec<PhaseSummary>,
    #[serde(default)]
    pub user_preferences: UserPreferences,
    #[serde(default)]
    pub project_content: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationSummary>,
    #[serde(default)]
    pub style_guide: Option<StyleGuide>,
}

impl Context {
    pub fn push_completed_phase(&mut self, summary: PhaseSummary) {
        self.previous_phases.push(summary);
    }

    pub fn last_worker(&self) -> Option<WorkerKind> {
        self.previous_phases.last().map(|p| p.worker_kind)
    }

    pub fn has_completed(&self, kind: WorkerKind) -> bool {
        self.previous_phases
            .iter()
            .any(|p| p.worker_kind == kind && p.status == crate::phase::PhaseStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseStatus;

    #[test]
    fn empty_context_has_no_last_worker() {
        let ctx = Context::default();
        assert!(ctx.last_worker().is_none());
    }

    #[test]
    fn has_completed_detects_matching_phase() {
        let mut ctx = Context::default();
        ctx.push_completed_phase(PhaseSummary {
            worker_kind: WorkerKind::Ideation,
            status: PhaseStatus::Completed,
            outputs: None,
            summary: None,
            completed_at: Utc::now(),
        });
        assert!(ctx.has_completed(WorkerKind::Ideation));
        assert!(!ctx.has_completed(WorkerKind::Refiner));
    }
}
