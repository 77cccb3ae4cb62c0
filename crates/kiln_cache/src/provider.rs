//! Resolution of the active cache backends from configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kiln_config::{ConfigError, KilnConfig, RemoteCacheConfig};

use crate::auth::{AuthenticationProvider, Token};
use crate::chain::CacheStorageChain;
use crate::error::CacheError;
use crate::local::LocalCacheStorage;
use crate::remote::RemoteCacheStorage;
use crate::retry::RetryPolicy;
use crate::storage::CacheStorage;
use crate::transport::{HttpTransport, RemoteTransport};

/// Builds the transport for a configured remote cache.
pub type TransportFactory = Arc<
    dyn Fn(&RemoteCacheConfig, Token) -> Result<Arc<dyn RemoteTransport>, CacheError>
        + Send
        + Sync,
>;

/// Resolves the ordered list of cache backends for one invocation.
///
/// The local backend is always present. The remote backend is added when
/// `[cache.remote]` is configured and a token resolves. A missing token, or
/// a failure to look one up, fails resolution if the remote cache is
/// required and otherwise degrades to local only with a warning.
///
/// The list is resolved once and reused by later calls to
/// [`storages`](Self::storages).
pub struct CacheStorageProvider {
    config: KilnConfig,
    project_root: PathBuf,
    auth: Arc<dyn AuthenticationProvider>,
    transport_factory: TransportFactory,
    resolved: tokio::sync::Mutex<Option<Vec<Arc<dyn CacheStorage>>>>,
}

impl CacheStorageProvider {
    /// Creates a provider for the project at `project_root`.
    pub fn new(
        config: KilnConfig,
        project_root: impl Into<PathBuf>,
        auth: Arc<dyn AuthenticationProvider>,
    ) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            auth,
            transport_factory: Arc::new(http_transport),
            resolved: tokio::sync::Mutex::new(None),
        }
    }

    /// Replaces the HTTP transport with another implementation.
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = factory;
        self
    }

    /// The local backend for this project.
    pub fn local(&self) -> LocalCacheStorage {
        LocalCacheStorage::new(self.config.cache.directory(&self.project_root))
    }

    /// The active backends, local first.
    pub async fn storages(&self) -> Result<Vec<Arc<dyn CacheStorage>>, CacheError> {
        let mut resolved = self.resolved.lock().await;
        if let Some(storages) = resolved.as_ref() {
            return Ok(storages.clone());
        }
        let storages = self.resolve().await?;
        *resolved = Some(storages.clone());
        Ok(storages)
    }

    /// The active backends wrapped in a [`CacheStorageChain`].
    pub async fn chain(&self) -> Result<CacheStorageChain, CacheError> {
        Ok(CacheStorageChain::new(self.storages().await?))
    }

    /// Forgets the resolved backends so the next call resolves again.
    pub async fn reset(&self) {
        *self.resolved.lock().await = None;
    }

    async fn resolve(&self) -> Result<Vec<Arc<dyn CacheStorage>>, CacheError> {
        let mut storages: Vec<Arc<dyn CacheStorage>> = vec![Arc::new(self.local())];

        let Some(remote) = &self.config.cache.remote else {
            return Ok(storages);
        };
        let token = match self.auth.authentication_token(&remote.url).await {
            Ok(Some(token)) => token,
            Ok(None) if remote.required => {
                return Err(CacheError::AuthenticationRequired {
                    url: remote.url.clone(),
                });
            }
            Ok(None) => {
                tracing::warn!(url = %remote.url, "remote cache disabled: no authentication token");
                return Ok(storages);
            }
            Err(e) if remote.required => return Err(e),
            Err(e) => {
                tracing::warn!(
                    url = %remote.url,
                    error = %e,
                    "remote cache disabled: authentication token lookup failed"
                );
                return Ok(storages);
            }
        };

        let handle = self
            .config
            .project
            .full_handle
            .clone()
            .ok_or_else(|| ConfigError::MissingField("project.full_handle".to_string()))?;
        let transport = (self.transport_factory)(remote, token)?;
        tracing::debug!(url = %remote.url, %handle, "remote cache enabled");
        storages.push(Arc::new(RemoteCacheStorage::new(
            transport,
            handle,
            RetryPolicy::new(remote.max_retries),
        )));
        Ok(storages)
    }
}

fn http_transport(
    remote: &RemoteCacheConfig,
    token: Token,
) -> Result<Arc<dyn RemoteTransport>, CacheError> {
    let timeout = Duration::from_secs(remote.timeout_secs);
    let transport = HttpTransport::new(&remote.url, token, timeout)?;
    Ok(Arc::new(transport))
}
