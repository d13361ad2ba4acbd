pub mod provider;
pub mod worker_client;

pub use provider::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, LocalDeterministicProvider,
    Provider, ProviderConfig, ProviderRegistry, ProvidersConfig,
};
pub use worker_client::{DispatchRequest, WorkerClient};
