//! Local filesystem state store.
//!
//! One file per key under a root directory, mirroring the flat key-value
//! shape of the host page's storage. Writes go through a temp file + rename
//! so a crashed write never leaves a half-written value behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StateStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    root_dir: PathBuf,
}

impl LocalStateStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::state(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::state(key, e))?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| AppError::state(key, e))?;
        file.write_all(value.as_bytes())
            .await
            .map_err(|e| AppError::state(key, e))?;
        file.flush().await.map_err(|e| AppError::state(key, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::state(key, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_and_get() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path());

        store.set("wa_notifier_last_hash", "abc123").await.unwrap();
        let value = store.get("wa_notifier_last_hash").await.unwrap();
        assert_eq!(value, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path());

        let value = store.get("nope").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path());

        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_creates_root_dir() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStateStore::new(tmp.path().join("nested/state"));

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }
}
