use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use draftloom_types::Context;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::persistence::{context_key, PersistenceBackend};

struct MemoryEntry {
    context: Context,
    stored_at: DateTime<Utc>,
}

/// Two-tier context store: an in-memory LRU fronting a pluggable persistence
/// backend. Reads fall through memory -> persistence -> a fresh default
/// context. Writes update memory synchronously and enqueue a best-effort
/// persistence write.
pub struct ContextStore {
    memory: Mutex<LruCache<String, MemoryEntry>>,
    backend: Arc<dyn PersistenceBackend>,
    ttl: Duration,
}

impl ContextStore {
    pub fn new(capacity: usize, ttl: Duration, backend: Arc<dyn PersistenceBackend>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero");
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            backend,
            ttl,
        }
    }

    pub async fn get(&self, project_id: &str, conversation_id: &str) -> Context {
        let key = context_key(project_id, conversation_id);
        let now = Utc::now();

        {
            let mut memory = self.memory.lock().await;
            if let Some(entry) = memory.get(&key) {
                if now - entry.stored_at < self.expiry_duration() {
                    return entry.context.clone();
                }
                memory.pop(&key);
            }
        }

        match self.backend.load_context(&key).await {
            Ok(Some(context)) => {
                self.put_memory(&key, context.clone(), now).await;
                context
            }
            Ok(None) => Context::default(),
            Err(err) => {
                tracing::warn!(error = %err, %key, "context persistence read failed, using fresh context");
                Context::default()
            }
        }
    }

    pub async fn set(&self, project_id: &str, conversation_id: &str, context: Context) {
        let key = context_key(project_id, conversation_id);
        self.put_memory(&key, context.clone(), Utc::now()).await;

        let backend = self.backend.clone();
        let write_key = key.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.save_context(&write_key, &context).await {
                tracing::warn!(error = %err, key = %write_key, "context persistence write failed");
            }
        });
    }

    async fn put_memory(&self, key: &str, context: Context, stored_at: DateTime<Utc>) {
        self.memory
            .lock()
            .await
            .put(key.to_string(), MemoryEntry { context, stored_at });
    }

    fn expiry_duration(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(3650))
    }

    /// Evicts expired memory entries and delegates persistence-side cleanup.
    pub async fn sweep(&self) {
        let cutoff = Utc::now() - self.expiry_duration();
        {
            let mut memory = self.memory.lock().await;
            let expired: Vec<String> = memory
                .iter()
                .filter(|(_, entry)| entry.stored_at < cutoff)
                .map(|(k, _)| k.clone())
                .collect();
            for key in expired {
                memory.pop(&key);
            }
        }
        if let Err(err) = self.backend.cleanup_expired(cutoff).await {
            tracing::warn!(error = %err, "context persistence sweep failed");
        }
    }
}

/// Spawns the periodic sweep task (default interval 60s), returning its handle
/// so callers can abort it on shutdown.
pub fn spawn_sweeper(store: Arc<ContextStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            store.sweep().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;

    #[tokio::test]
    async fn miss_returns_default_context() {
        let store = ContextStore::new(10, Duration::from_secs(60), Arc::new(InMemoryPersistence::default()));
        let ctx = store.get("p1", "c1").await;
        assert!(ctx.previous_phases.is_empty());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_memory() {
        let store = ContextStore::new(10, Duration::from_secs(60), Arc::new(InMemoryPersistence::default()));
        let mut ctx = Context::default();
        ctx.project_content = "hello world".into();
        store.set("p1", "c1", ctx).await;
        let loaded = store.get("p1", "c1").await;
        assert_eq!(loaded.project_content, "hello world");
    }

    #[tokio::test]
    async fn expired_memory_entry_falls_through_to_persistence() {
        let backend = Arc::new(InMemoryPersistence::default());
        let store = ContextStore::new(10, Duration::from_millis(5), backend);
        let mut ctx = Context::default();
        ctx.project_content = "draft".into();
        store.set("p1", "c1", ctx).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // persistence write is best-effort/async; give it a moment to land
        tokio::time::sleep(Duration::from_millis(20)).await;
        let loaded = store.get("p1", "c1").await;
        assert_eq!(loaded.project_content, "draft");
    }

    #[tokio::test]
    async fn sweep_evicts_expired_memory_entries() {
        let store = ContextStore::new(10, Duration::from_millis(5), Arc::new(InMemoryPersistence::default()));
        store.set("p1", "c1", Context::default()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.sweep().await;
        assert_eq!(store.memory.lock().await.len(), 0);
    }
}
