use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use draftloom_types::{Context, OrchestratorError, Request, Response, WorkerKind};
use tokio_util::sync::CancellationToken;

/// The capability set shared by all four worker roles.
#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> WorkerKind;

    fn max_context_length(&self) -> usize;

    fn validate(&self, request: &Request) -> Result<(), OrchestratorError> {
        if request.content_length() > self.max_context_length() {
            return Err(OrchestratorError::ValidationError {
                message: format!(
                    "content length {} exceeds {} worker's max of {}",
                    request.content_length(),
                    self.kind(),
                    self.max_context_length()
                ),
            });
        }
        if request.content.trim().is_empty() {
            return Err(OrchestratorError::ValidationError {
                message: "request content must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn build_system_context(&self, context: &Context) -> String;

    async fn process(
        &self,
        request: &Request,
        context: &Context,
        cancel: CancellationToken,
    ) -> Result<Response, OrchestratorError>;

    async fn health_check(&self) -> bool;
}

#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerKind, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }

    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.insert(worker.kind(), worker);
    }

    pub fn get(&self, kind: WorkerKind) -> Option<Arc<dyn Worker>> {
        self.workers.get(&kind).cloned()
    }

    pub async fn is_healthy(&self, kind: WorkerKind) -> bool {
        match self.workers.get(&kind) {
            Some(worker) => worker.health_check().await,
            None => false,
        }
    }
}
