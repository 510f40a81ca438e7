//! S3-compatible object storage backend.

use crate::key;
use crate::ObjectStore;
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use docvault_core::{Error, Result};
use std::time::Duration;
use tracing::trace;

/// Backed by any S3-compatible endpoint (AWS S3, MinIO, R2, ...) via a
/// custom `endpoint_url` on the client config.
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3CompatibleStore {
    pub fn new(client: Client, bucket: impl Into<String>, prefix: Option<String>) -> Self {
        S3CompatibleStore {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    fn object_key(&self, key: &str) -> Result<String> {
        let normalized = key::normalize(key)?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{prefix}/{normalized}"),
            None => normalized,
        })
    }
}

#[async_trait]
impl ObjectStore for S3CompatibleStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let object_key = self.object_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("s3 put {object_key}: {e}")))?;
        trace!(key = %object_key, "put s3 object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let object_key = self.object_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    Error::not_found(&object_key)
                } else {
                    Error::Backend(format!("s3 get {object_key}: {e}"))
                }
            })?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Backend(format!("s3 read body {object_key}: {e}")))?
            .into_bytes();
        Ok(bytes)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("s3 delete {object_key}: {e}")))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let object_key = self.object_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::Backend(format!("s3 head {object_key}: {e}"))),
        }
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        let object_key = self.object_key(key)?;
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| Error::Backend(format!("presign config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .presigned(presign_config)
            .await
            .map_err(|e| Error::Backend(format!("s3 presign {object_key}: {e}")))?;
        Ok(presigned.uri().to_string())
    }
}

fn is_not_found<E: std::fmt::Display>(e: &aws_sdk_s3::error::SdkError<E>) -> bool {
    // SdkError service variants carry their own error body; checking the
    // rendered message is the portable way across S3-compatible backends
    // that don't all populate strongly-typed `NoSuchKey` the same way.
    e.to_string().contains("NoSuchKey") || e.to_string().contains("NotFound") || e.to_string().contains("404")
}
