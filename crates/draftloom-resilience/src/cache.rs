use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use draftloom_types::{CacheEntry, Response, WorkerKind};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Content-addressed, advisory cache of worker responses. A miss never fails the
/// request and a stale entry is never served.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    hits: Arc<Mutex<u64>>,
    misses: Arc<Mutex<u64>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(0)),
            misses: Arc::new(Mutex::new(0)),
        }
    }

    pub async fn get(&self, fingerprint: &str) -> Option<Response> {
        let mut entries = self.entries.lock().await;
        match entries.get(fingerprint) {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                *self.hits.lock().await += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(fingerprint);
                *self.misses.lock().await += 1;
                None
            }
            None => {
                *self.misses.lock().await += 1;
                None
            }
        }
    }

    pub async fn set(&self, fingerprint: String, value: Response, ttl_ms: u64) {
        let entry = CacheEntry {
            fingerprint: fingerprint.clone(),
            value,
            created_at: Utc::now(),
            ttl_ms,
        };
        self.entries.lock().await.insert(fingerprint, entry);
    }

    pub async fn hit_rate(&self) -> f64 {
        let hits = *self.hits.lock().await as f64;
        let misses = *self.misses.lock().await as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

/// A canonical, hashable description of a worker call used to derive a cache key.
pub struct Fingerprint<'a> {
    pub worker_kind: WorkerKind,
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub temperature_bits: u64,
    pub max_tokens: Option<u32>,
    pub relevant_context_digest: &'a str,
}

impl Fingerprint<'_> {
    pub fn compute(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.worker_kind.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.model.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.system_prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.user_prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.temperature_bits.to_le_bytes());
        hasher.update(b"\0");
        hasher.update(self.max_tokens.unwrap_or(0).to_le_bytes());
        hasher.update(b"\0");
        hasher.update(self.relevant_context_digest.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
