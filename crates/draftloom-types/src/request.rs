use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::worker::WorkerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: String,
    pub project_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub preferred_worker: Option<WorkerKind>,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl Request {
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}
