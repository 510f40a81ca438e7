//! LocalFS object storage backend.

use crate::key;
use crate::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// Stores payloads under `<root>/payloads/<key>` (spec §6 persisted layout),
/// with atomic write-then-rename and an fsync before return.
pub struct LocalFsStore {
    root: PathBuf,
}

impl LocalFsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFsStore { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let normalized = key::normalize(key)?;
        Ok(self.root.join(normalized))
    }

    fn loopback_url(&self, key: &str) -> String {
        format!("local://{}/{key}", self.root.display())
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let target = self.path_for(key)?;
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let tmp = dir.join(format!(
            ".{}.tmp",
            target.file_name().and_then(|n| n.to_str()).unwrap_or("obj")
        ));
        tokio::fs::create_dir_all(&dir).await?;
        {
            let mut file = tokio::fs::File::create(&tmp).await?;
            use tokio::io::AsyncWriteExt;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&tmp, &target).await?;
        trace!(key, bytes = bytes.len(), "wrote local object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| Error::not_found(key))?;
        Ok(Bytes::from(bytes))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn signed_url(&self, key: &str, _ttl: Duration) -> Result<String> {
        key::normalize(key)?;
        Ok(self.loopback_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        store.put("a/b.bin", Bytes::from_static(b"hello")).await.unwrap();
        let bytes = store.get("a/b.bin").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        let result = store.get("missing").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        store.put("k", Bytes::from_static(b"x")).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        let result = store.put("../escape", Bytes::from_static(b"x")).await;
        assert!(result.is_err());
    }
}
