pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod factcheck;
pub mod ledger;
pub mod metrics;
pub mod phase;
pub mod provider;
pub mod request;
pub mod response;
pub mod routing;
pub mod worker;

pub use cache::CacheEntry;
pub use config::{CacheTtlConfig, CircuitBreakerConfig, OrchestratorConfig, RetryConfig};
pub use context::{Context, ConversationSummary, ExperienceLevel, Personality, StyleGuide, UserPreferences};
pub use error::{OrchestratorError, RateLimitReason};
pub use factcheck::{
    ClaimKind, ConflictKind, ConflictingInformation, FactCheckPhaseOutput, FactCheckResult,
    FactCheckStatus, FactualClaim, Position, Priority, SeoSuggestion, SeoSuggestionKind,
    SourceReference,
};
pub use ledger::{BudgetStatus, CostLedgerEntry, UsageStats};
pub use metrics::Metrics;
pub use phase::{Phase, PhaseStatus, PhaseSummary};
pub use provider::{ModelInfo, ProviderInfo};
pub use request::Request;
pub use response::{Response, ResponseMetadata, TokenUsage};
pub use routing::{ProjectStatus, RequestType, RoutingContext};
pub use worker::WorkerKind;
