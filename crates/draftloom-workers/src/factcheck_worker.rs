use std::sync::Arc;

use async_trait::async_trait;
use draftloom_factcheck::FactCheckEngine;
use draftloom_types::{Context, OrchestratorError, Request, Response, WorkerKind};
use tokio_util::sync::CancellationToken;

use crate::worker::Worker;

pub struct FactCheckWorker {
    max_context_length: usize,
    engine: Arc<FactCheckEngine>,
}

impl FactCheckWorker {
    pub fn new(max_context_length: usize, engine: Arc<FactCheckEngine>) -> Self {
        Self {
            max_context_length,
            engine,
        }
    }
}

#[async_trait]
impl Worker for FactCheckWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Factchecker
    }

    fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    fn build_system_context(&self, _context: &Context) -> String {
        "You are a fact-checking and SEO assistant.".to_string()
    }

    /// Never returns `WorkerCallFailed`: the fact-check engine always produces a
    /// well-formed response, falling back to heuristics internally.
    async fn process(
        &self,
        request: &Request,
        _context: &Context,
        cancel: CancellationToken,
    ) -> Result<Response, OrchestratorError> {
        if request.content.trim().is_empty() {
            return Err(OrchestratorError::ValidationError {
                message: "request content must not be empty".to_string(),
            });
        }
        Ok(self.engine.run(&request.user_id, &request.content, cancel).await)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
