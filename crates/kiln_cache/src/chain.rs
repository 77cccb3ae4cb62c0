//! The cache controller: fetch and store across every active backend.

use std::sync::Arc;

use kiln_common::ContentHash;

use crate::artifact::Artifact;
use crate::error::CacheError;
use crate::storage::{CacheStorage, StorageKind};

/// An ordered list of backends, local first.
///
/// Fetches consult the backends in order and copy a hit into every backend
/// that missed before it. Stores write to every backend. Remote failures
/// are logged and treated as misses; local failures are returned.
#[derive(Clone, Default)]
pub struct CacheStorageChain {
    storages: Vec<Arc<dyn CacheStorage>>,
}

impl CacheStorageChain {
    /// Creates a chain over `storages`, consulted in the given order.
    pub fn new(storages: Vec<Arc<dyn CacheStorage>>) -> Self {
        Self { storages }
    }

    /// The backends in consultation order.
    pub fn storages(&self) -> &[Arc<dyn CacheStorage>] {
        &self.storages
    }

    /// Fetches an artifact from the first backend that has it.
    pub async fn fetch(
        &self,
        hash: ContentHash,
        name: &str,
    ) -> Result<Option<Artifact>, CacheError> {
        for (i, storage) in self.storages.iter().enumerate() {
            let kind = storage.kind();
            match storage.fetch(hash, name).await {
                Ok(Some(artifact)) => {
                    tracing::debug!(%hash, name, storage = %kind, "cache hit");
                    self.write_through(&self.storages[..i], hash, &artifact).await;
                    return Ok(Some(artifact));
                }
                Ok(None) => tracing::debug!(%hash, name, storage = %kind, "cache miss"),
                Err(e) if kind == StorageKind::Remote => {
                    tracing::warn!(
                        %hash,
                        name,
                        error = %e,
                        "remote cache fetch failed; treating as a miss"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Stores an artifact in every backend.
    ///
    /// Every backend is attempted even if an earlier one fails; the first
    /// local failure is returned afterwards.
    pub async fn store(&self, hash: ContentHash, artifact: &Artifact) -> Result<(), CacheError> {
        let mut local_failure = None;
        for storage in &self.storages {
            match storage.store(hash, artifact).await {
                Ok(()) => tracing::debug!(
                    %hash,
                    name = %artifact.name,
                    storage = %storage.kind(),
                    "stored artifact"
                ),
                Err(e) if storage.kind() == StorageKind::Remote => {
                    tracing::warn!(
                        %hash,
                        name = %artifact.name,
                        error = %e,
                        "remote cache store failed"
                    );
                }
                Err(e) => {
                    local_failure.get_or_insert(e);
                }
            }
        }
        local_failure.map_or(Ok(()), Err)
    }

    /// Returns `true` if any backend holds the artifact.
    pub async fn exists(&self, hash: ContentHash, name: &str) -> Result<bool, CacheError> {
        for storage in &self.storages {
            match storage.exists(hash, name).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if storage.kind() == StorageKind::Remote => {
                    tracing::warn!(%hash, name, error = %e, "remote cache existence check failed");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    async fn write_through(
        &self,
        missed: &[Arc<dyn CacheStorage>],
        hash: ContentHash,
        artifact: &Artifact,
    ) {
        for storage in missed {
            if let Err(e) = storage.store(hash, artifact).await {
                tracing::warn!(
                    %hash,
                    name = %artifact.name,
                    storage = %storage.kind(),
                    error = %e,
                    "failed to copy cache hit into earlier storage"
                );
            }
        }
    }
}
