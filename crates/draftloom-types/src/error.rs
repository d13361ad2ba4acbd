use serde::Serialize;
use thiserror::Error;

use crate::worker::WorkerKind;

/// The closed taxonomy of errors the orchestration runtime can surface to a caller.
///
/// Each variant is a distinct failure kind, not a wrapper around an arbitrary exception -
/// callers are expected to match on `kind()` rather than format strings.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrchestratorError {
    #[error("request failed validation: {message}")]
    ValidationError { message: String },

    #[error("rate limited ({reason})")]
    RateLimited {
        reason: RateLimitReason,
        retry_after_ms: u64,
    },

    #[error("no healthy worker available for this request")]
    NoAgentAvailable,

    #[error("worker {worker} timed out after {timeout_ms}ms")]
    Timeout { worker: WorkerKind, timeout_ms: u64 },

    #[error("circuit open for dependency `{dependency}`")]
    CircuitOpen { dependency: String },

    #[error("upstream error: {message}")]
    UpstreamError { message: String, retryable: bool },

    #[error("worker {worker} call failed after {attempts} attempt(s): {last_error}")]
    WorkerCallFailed {
        worker: WorkerKind,
        attempts: u32,
        last_error: String,
    },

    #[error("persistence error: {message}")]
    PersistenceError { message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitReason {
    Window,
    DailyBudget,
    MonthlyBudget,
}

impl OrchestratorError {
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::ValidationError { .. } => "validation_error",
            OrchestratorError::RateLimited { .. } => "rate_limited",
            OrchestratorError::NoAgentAvailable => "no_agent_available",
            OrchestratorError::Timeout { .. } => "timeout",
            OrchestratorError::CircuitOpen { .. } => "circuit_open",
            OrchestratorError::UpstreamError { .. } => "upstream_error",
            OrchestratorError::WorkerCallFailed { .. } => "worker_call_failed",
            OrchestratorError::PersistenceError { .. } => "persistence_error",
            OrchestratorError::InternalError { .. } => "internal_error",
        }
    }

    pub fn http_like_status(&self) -> u16 {
        match self {
            OrchestratorError::ValidationError { .. } => 400,
            OrchestratorError::RateLimited { .. } => 429,
            OrchestratorError::NoAgentAvailable => 503,
            OrchestratorError::Timeout { .. } => 504,
            OrchestratorError::CircuitOpen { .. } => 503,
            OrchestratorError::UpstreamError { .. } => 502,
            OrchestratorError::WorkerCallFailed { .. } => 502,
            OrchestratorError::PersistenceError { .. } => 500,
            OrchestratorError::InternalError { .. } => 500,
        }
    }

    pub fn is_retryable_upstream(&self) -> bool {
        matches!(self, OrchestratorError::UpstreamError { retryable, .. } if *retryable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        let err = OrchestratorError::NoAgentAvailable;
        assert_eq!(err.kind(), "no_agent_available");
        assert_eq!(err.http_like_status(), 503);
    }

    #[test]
    fn non_retryable_upstream_error_is_not_retryable() {
        let err = OrchestratorError::UpstreamError {
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!err.is_retryable_upstream());
    }
}
