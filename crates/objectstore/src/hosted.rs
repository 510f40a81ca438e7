//! Hosted REST object store backend — a bearer-authenticated HTTP API
//! fronting object storage, for deployments that don't want direct S3 access.

use crate::key;
use crate::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use docvault_core::{Error, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Talks to a hosted object-store API with the shape
/// `{base_url}/objects/{key}` for put/get/delete/head and
/// `{base_url}/objects/{key}/sign?ttl_secs=N` for signed URLs.
pub struct HostedObjectStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HostedObjectStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        HostedObjectStore {
            client: Client::new(),
            base_url: base_url.into(),
            auth_token,
        }
    }

    fn object_url(&self, key: &str) -> Result<String> {
        let normalized = key::normalize(key)?;
        Ok(format!("{}/objects/{normalized}", self.base_url.trim_end_matches('/')))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl ObjectStore for HostedObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let url = self.object_url(key)?;
        let response = self
            .authed(self.client.put(&url))
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("hosted put {url}: {e}")))?;
        ensure_success(response, &url).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let url = self.object_url(key)?;
        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("hosted get {url}: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(key));
        }
        let response = ensure_success(response, &url).await?;
        response
            .bytes()
            .await
            .map_err(|e| Error::Backend(format!("hosted read body {url}: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("hosted delete {url}: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response, &url).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.object_url(key)?;
        let response = self
            .authed(self.client.head(&url))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("hosted head {url}: {e}")))?;
        Ok(response.status().is_success())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String> {
        let url = format!("{}/sign", self.object_url(key)?);
        let response = self
            .authed(self.client.post(&url))
            .query(&[("ttl_secs", ttl.as_secs().to_string())])
            .send()
            .await
            .map_err(|e| Error::Backend(format!("hosted sign {url}: {e}")))?;
        let response = ensure_success(response, &url).await?;
        response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("hosted sign body {url}: {e}")))
    }
}

async fn ensure_success(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(Error::Backend(format!(
            "hosted object store returned {} for {url}",
            response.status()
        )))
    }
}
