//! Storage backend abstraction.

use std::fmt;

use async_trait::async_trait;
use kiln_common::ContentHash;

use crate::artifact::Artifact;
use crate::error::CacheError;

/// Where a backend keeps its artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// On this machine.
    Local,
    /// On a cache server.
    Remote,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageKind::Local => "local",
            StorageKind::Remote => "remote",
        })
    }
}

/// A backend that stores artifacts by cache key and artifact name.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Where this backend keeps its artifacts.
    fn kind(&self) -> StorageKind;

    /// Fetches an artifact, returning `None` on a miss.
    async fn fetch(&self, hash: ContentHash, name: &str) -> Result<Option<Artifact>, CacheError>;

    /// Stores an artifact under `hash`.
    async fn store(&self, hash: ContentHash, artifact: &Artifact) -> Result<(), CacheError>;

    /// Returns `true` if an artifact is stored.
    async fn exists(&self, hash: ContentHash, name: &str) -> Result<bool, CacheError>;
}
