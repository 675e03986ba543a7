//! Implements SeenStorePort using a JSON file.
//!
//! One JSON array of integers (message ids and group ids), rewritten
//! wholesale after every processed unit so an interrupted run resumes where
//! it left off.

use crate::domain::DomainError;
use crate::ports::SeenStorePort;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// JSON file-based seen store. All access serializes through one lock.
pub struct SeenJson {
    path: std::path::PathBuf,
    cache: tokio::sync::Mutex<HashSet<i64>>,
}

impl SeenJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: tokio::sync::Mutex::new(HashSet::new()),
        }
    }

    /// Load history from disk. A missing file starts empty; an unreadable
    /// one resets the history with a warning instead of failing the run.
    pub async fn load(&self) -> Result<(), DomainError> {
        let ids: HashSet<i64> = match fs::read_to_string(&self.path).await {
            Ok(s) => match serde_json::from_str::<Vec<i64>>(&s) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "unreadable seen history, resetting"
                    );
                    HashSet::new()
                }
            },
            Err(_) => HashSet::new(),
        };
        *self.cache.lock().await = ids;
        Ok(())
    }

    /// Atomic save using write-replace.
    /// 1. Write to temp file
    /// 2. sync_all() to ensure flush to disk
    /// 3. Atomic rename to target path
    /// An interrupted run leaves either the old or the new file, never a
    /// truncated one.
    async fn save(&self, ids: &HashSet<i64>) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::State(format!("create output dir: {}", e)))?;
        }

        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let json = serde_json::to_string_pretty(&sorted)
            .map_err(|e| DomainError::State(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::State(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::State(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::State(format!("sync temp file: {}", e)))?;
        drop(f); // Close file handle before rename

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::State(format!("atomic rename failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SeenStorePort for SeenJson {
    async fn contains_any(&self, ids: &[i64]) -> bool {
        let cache = self.cache.lock().await;
        ids.iter().any(|id| cache.contains(id))
    }

    async fn insert(&self, ids: &[i64]) -> Result<(), DomainError> {
        // The lock is held across the write so concurrent inserts serialize
        // into distinct full-file rewrites.
        let mut cache = self.cache.lock().await;
        cache.extend(ids.iter().copied());
        self.save(&cache).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenJson::new(dir.path().join("seen.json"));
        store.load().await.unwrap();
        assert!(!store.contains_any(&[1, 2, 3]).await);
    }

    #[tokio::test]
    async fn corrupt_file_resets_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SeenJson::new(&path);
        store.load().await.unwrap();
        assert!(!store.contains_any(&[7]).await);

        // Recovery is in-memory only until the next insert rewrites the file.
        store.insert(&[7]).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<i64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(ids, vec![7]);
    }

    #[tokio::test]
    async fn insert_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let store = SeenJson::new(&path);
        store.load().await.unwrap();
        store.insert(&[10, 20]).await.unwrap();
        store.insert(&[30]).await.unwrap();
        assert!(store.contains_any(&[20, 99]).await);

        let reopened = SeenJson::new(&path);
        reopened.load().await.unwrap();
        assert!(reopened.contains_any(&[10]).await);
        assert!(reopened.contains_any(&[30]).await);
        assert!(!reopened.contains_any(&[40]).await);
    }

    #[tokio::test]
    async fn file_is_a_sorted_integer_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let store = SeenJson::new(&path);
        store.load().await.unwrap();
        store.insert(&[30, 10, 20]).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<i64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
