use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use draftloom_types::Context;
use tokio::sync::Mutex;

/// The opaque persistence surface consumers must provide. Keys are
/// `"{project_id}_{conversation_id}"`.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    async fn save_context(&self, key: &str, value: &Context) -> anyhow::Result<()>;
    async fn load_context(&self, key: &str) -> anyhow::Result<Option<Context>>;
    async fn delete_context(&self, key: &str) -> anyhow::Result<()>;
    async fn cleanup_expired(&self, cutoff: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()>;
}

pub fn context_key(project_id: &str, conversation_id: &str) -> String {
    format!("{project_id}_{conversation_id}")
}

/// In-memory backend, exercised by this repository's own tests.
#[derive(Default)]
pub struct InMemoryPersistence {
    entries: Mutex<HashMap<String, (Context, chrono::DateTime<chrono::Utc>)>>,
}

#[async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_context(&self, key: &str, value: &Context) -> anyhow::Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.clone(), chrono::Utc::now()));
        Ok(())
    }

    async fn load_context(&self, key: &str) -> anyhow::Result<Option<Context>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .map(|(ctx, _)| ctx.clone()))
    }

    async fn delete_context(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self, cutoff: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()> {
        self.entries.lock().await.retain(|_, (_, saved_at)| *saved_at >= cutoff);
        Ok(())
    }
}

/// File-backed JSON implementation: one file per key under a configured state
/// directory, suitable for single-process deployments.
pub struct FileJsonPersistence {
    root: PathBuf,
}

impl FileJsonPersistence {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe_key}.json"))
    }
}

#[async_trait]
impl PersistenceBackend for FileJsonPersistence {
    async fn save_context(&self, key: &str, value: &Context) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let body = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    async fn load_context(&self, key: &str) -> anyhow::Result<Option<Context>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_context(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn cleanup_expired(&self, cutoff: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let modified: chrono::DateTime<chrono::Utc> = modified.into();
            if modified < cutoff {
                let _ = tokio::fs::remove_file(entry.path()).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trips_saved_context() {
        let backend = InMemoryPersistence::default();
        let key = context_key("p1", "c1");
        backend.save_context(&key, &Context::default()).await.unwrap();
        assert!(backend.load_context(&key).await.unwrap().is_some());
        backend.delete_context(&key).await.unwrap();
        assert!(backend.load_context(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_backend_round_trips_saved_context() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileJsonPersistence::new(dir.path().to_path_buf());
        let key = context_key("p2", "c2");
        let mut ctx = Context::default();
        ctx.project_content = "draft text".into();
        backend.save_context(&key, &ctx).await.unwrap();
        let loaded = backend.load_context(&key).await.unwrap().unwrap();
        assert_eq!(loaded.project_content, "draft text");
    }

    #[tokio::test]
    async fn file_backend_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileJsonPersistence::new(dir.path().to_path_buf());
        assert!(backend.load_context("missing").await.unwrap().is_none());
    }
}
