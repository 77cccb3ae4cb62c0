//! HTTP access to the remote cache server.
//!
//! Artifacts are addressed as `<base>/api/cache/<handle>/<hash>/<name>`:
//! `HEAD` checks existence, `GET` downloads and `PUT` uploads.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kiln_common::ContentHash;
use reqwest::StatusCode;

use crate::auth::Token;
use crate::error::{CacheError, TransportError};

/// Existence check, upload and download of artifacts on a cache server.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Returns `true` if the server holds the artifact.
    async fn exists(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
    ) -> Result<bool, TransportError>;

    /// Downloads an artifact. A missing artifact is [`TransportError::NotFound`].
    async fn download(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
    ) -> Result<Bytes, TransportError>;

    /// Uploads an artifact.
    async fn upload(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
        data: Bytes,
    ) -> Result<(), TransportError>;
}

/// [`RemoteTransport`] over HTTPS with bearer authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Token,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url`.
    pub fn new(base_url: &str, token: Token, timeout: Duration) -> Result<Self, CacheError> {
        reqwest::Url::parse(base_url).map_err(|e| CacheError::Remote {
            operation: "connect",
            source: TransportError::Permanent(format!("invalid URL '{base_url}': {e}")),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kiln/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::Remote {
                operation: "connect",
                source: TransportError::Permanent(e.to_string()),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// URL of an artifact.
    pub fn artifact_url(&self, handle: &str, hash: ContentHash, name: &str) -> String {
        format!("{}/api/cache/{handle}/{hash}/{name}", self.base_url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let response = request
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(|e| classify_error(&e))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_status(status))
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn exists(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
    ) -> Result<bool, TransportError> {
        let url = self.artifact_url(handle, hash, name);
        match self.send(self.client.head(&url)).await {
            Ok(_) => Ok(true),
            Err(TransportError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn download(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
    ) -> Result<Bytes, TransportError> {
        let url = self.artifact_url(handle, hash, name);
        let response = self.send(self.client.get(&url)).await?;
        response.bytes().await.map_err(|e| classify_error(&e))
    }

    async fn upload(
        &self,
        handle: &str,
        hash: ContentHash,
        name: &str,
        data: Bytes,
    ) -> Result<(), TransportError> {
        let url = self.artifact_url(handle, hash, name);
        self.send(self.client.put(&url).body(data)).await?;
        Ok(())
    }
}

/// Classifies an unsuccessful HTTP status.
pub(crate) fn classify_status(status: StatusCode) -> TransportError {
    if status == StatusCode::NOT_FOUND {
        TransportError::NotFound
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        TransportError::Transient(status.to_string())
    } else {
        TransportError::Permanent(status.to_string())
    }
}

fn classify_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        TransportError::Transient(error.to_string())
    } else {
        TransportError::Permanent(error.to_string())
    }
}
