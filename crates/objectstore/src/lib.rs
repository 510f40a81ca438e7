//! Pluggable object storage abstraction over local FS, S3-compatible, and
//! hosted REST backends (spec §4.8, C8).

pub mod hosted;
pub mod key;
pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::Result;
use std::time::Duration;

/// Unified read/write/delete/URL contract every backend variant implements.
/// Keys are relative paths, normalized and traversal-checked by [`key::normalize`]
/// before a backend ever sees them.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Durable on return: fsync on local FS, server ACK for remote backends
    /// (spec §4.8).
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Bytes>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// For backends that support it; local FS returns a loopback URL an
    /// HTTP adapter could serve.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String>;

    async fn put_text(&self, key: &str, text: &str) -> Result<()> {
        self.put(key, Bytes::copy_from_slice(text.as_bytes())).await
    }

    async fn get_text(&self, key: &str) -> Result<String> {
        let bytes = self.get(key).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| docvault_core::Error::Corrupt(format!("non-utf8 object at {key}: {e}")))
    }
}

pub use hosted::HostedObjectStore;
pub use local::LocalFsStore;
pub use s3::S3CompatibleStore;
