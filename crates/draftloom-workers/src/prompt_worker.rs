use std::sync::Arc;

use async_trait::async_trait;
use draftloom_providers::{DispatchRequest, WorkerClient};
use draftloom_types::{Context, OrchestratorError, Request, Response, WorkerKind};
use tokio_util::sync::CancellationToken;

use crate::worker::Worker;

/// A thin adapter shared by the three LLM-backed worker roles (ideation,
/// refiner, media). Prompt construction is role-specific but incidental; only
/// the published `Worker` contract is exercised by the orchestrator.
pub struct PromptWorker {
    kind: WorkerKind,
    max_context_length: usize,
    default_model: String,
    provider_id: Option<String>,
    client: Arc<WorkerClient>,
}

impl PromptWorker {
    pub fn new(
        kind: WorkerKind,
        max_context_length: usize,
        default_model: impl Into<String>,
        provider_id: Option<String>,
        client: Arc<WorkerClient>,
    ) -> Self {
        Self {
            kind,
            max_context_length,
            default_model: default_model.into(),
            provider_id,
            client,
        }
    }

    fn system_prompt(&self, context: &Context) -> String {
        let base = match self.kind {
            WorkerKind::Ideation => {
                "You are a brainstorming assistant. Propose concrete, varied angles and an outline."
            }
            WorkerKind::Refiner => {
                "You are a prose editor. Tighten wording, fix structure, and preserve the author's voice."
            }
            WorkerKind::Media => {
                "You are a media assistant. Suggest images, captions, and placement for the given draft."
            }
            WorkerKind::Factchecker => unreachable!("factchecker is handled by FactCheckWorker"),
        };
        let personality = match context.user_preferences.personality {
            draftloom_types::Personality::Casual => "Write in a casual, friendly tone.",
            draftloom_types::Personality::Formal => "Write in a formal, professional tone.",
            draftloom_types::Personality::Direct => "Be direct and concise.",
        };
        format!("{base} {personality}")
    }
}

#[async_trait]
impl Worker for PromptWorker {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    fn build_system_context(&self, context: &Context) -> String {
        self.system_prompt(context)
    }

    async fn process(
        &self,
        request: &Request,
        context: &Context,
        cancel: CancellationToken,
    ) -> Result<Response, OrchestratorError> {
        self.validate(request)?;

        let system_prompt = self.build_system_context(context);
        let digest = format!("{}:{}", context.previous_phases.len(), context.project_content.len());

        self.client
            .dispatch(
                DispatchRequest {
                    worker_kind: self.kind,
                    user_id: &request.user_id,
                    request_id: request
                        .options
                        .get("request_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown"),
                    provider_id: self.provider_id.as_deref(),
                    model: &self.default_model,
                    system_prompt: &system_prompt,
                    user_prompt: &request.content,
                    relevant_context_digest: &digest,
                    max_tokens: None,
                    temperature: None,
                },
                cancel,
            )
            .await
    }

    async fn health_check(&self) -> bool {
        self.client.is_dependency_healthy(self.provider_id.as_deref()).await
    }
}
