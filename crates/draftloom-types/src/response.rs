use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn cost_usd(self, usd_per_token: f64) -> f64 {
        self.total_tokens as f64 * usd_per_token
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: u64,
    pub token_usage: TokenUsage,
    pub cost_usd: f64,
    pub model: String,
    pub confidence: f64,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub phase_outputs: Option<serde_json::Value>,
}
