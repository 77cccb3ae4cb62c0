//! Content-addressed artifact storage on the local disk.
//!
//! Artifacts live at `<cache_dir>/<hash>/<name>.kiln`. Reads are fail-safe:
//! a missing, truncated or corrupt file is a miss. Writes go to a temporary
//! file in the destination directory that is renamed into place, so an
//! interrupted write never leaves a partial artifact behind.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use kiln_common::ContentHash;

use crate::artifact::{self, Artifact};
use crate::error::CacheError;
use crate::storage::{CacheStorage, StorageKind};

/// File extension of stored artifacts.
const ARTIFACT_EXTENSION: &str = "kiln";

/// Local artifact store rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct LocalCacheStorage {
    cache_dir: PathBuf,
}

impl LocalCacheStorage {
    /// Creates a store rooted at `cache_dir`. The directory is created lazily.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File path of an artifact.
    pub fn artifact_path(&self, hash: ContentHash, name: &str) -> PathBuf {
        self.cache_dir
            .join(hash.to_string())
            .join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }

    /// Removes every hash directory not in `live`.
    ///
    /// Entries that are not hash directories are left alone. Returns the
    /// number of directories removed.
    pub fn gc(&self, live: &BTreeSet<ContentHash>) -> Result<usize, CacheError> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CacheError::Io { path, source }
        };

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.cache_dir).map_err(io(&self.cache_dir))? {
            let entry = entry.map_err(io(&self.cache_dir))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(hash) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<ContentHash>().ok())
            else {
                continue;
            };
            if !live.contains(&hash) {
                std::fs::remove_dir_all(&path).map_err(io(&path))?;
                removed += 1;
            }
        }
        tracing::debug!(removed, dir = %self.cache_dir.display(), "garbage collected local cache");
        Ok(removed)
    }
}

#[async_trait]
impl CacheStorage for LocalCacheStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn fetch(&self, hash: ContentHash, name: &str) -> Result<Option<Artifact>, CacheError> {
        artifact::validate_name(name)?;
        let path = self.artifact_path(hash, name);
        let Ok(raw) = tokio::fs::read(&path).await else {
            return Ok(None);
        };
        match artifact::decode(&raw) {
            Some(payload) => Ok(Some(Artifact {
                name: name.to_string(),
                data: Bytes::copy_from_slice(payload),
            })),
            None => {
                tracing::warn!(path = %path.display(), "ignoring corrupt cache artifact");
                Ok(None)
            }
        }
    }

    async fn store(&self, hash: ContentHash, artifact: &Artifact) -> Result<(), CacheError> {
        artifact::validate_name(&artifact.name)?;
        let path = self.artifact_path(hash, &artifact.name);
        let encoded = artifact::encode(&artifact.data)?;
        tokio::task::spawn_blocking(move || write_atomic(&path, &encoded))
            .await
            .map_err(|e| CacheError::Task {
                reason: e.to_string(),
            })?
    }

    async fn exists(&self, hash: ContentHash, name: &str) -> Result<bool, CacheError> {
        Ok(self.fetch(hash, name).await?.is_some())
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CacheError::Io { path, source }
    };
    std::fs::create_dir_all(dir).map_err(io(dir))?;
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io(dir))?;
    file.write_all(contents).map_err(io(file.path()))?;
    file.as_file().sync_all().map_err(io(file.path()))?;
    file.persist(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, LocalCacheStorage) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStorage::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn store_and_fetch_roundtrip() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"Core");
        let data: Vec<u8> = (0..10_000).map(|i| (i % 256) as u8).collect();
        let artifact = Artifact::new("Core.xcframework", data.clone());
        store.store(hash, &artifact).await.unwrap();

        let fetched = store.fetch(hash, "Core.xcframework").await.unwrap().unwrap();
        assert_eq!(fetched.data.as_ref(), data.as_slice());
        assert!(store.exists(hash, "Core.xcframework").await.unwrap());
    }

    #[tokio::test]
    async fn missing_artifact_is_a_miss() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"nothing");
        assert!(store.fetch(hash, "Core.xcframework").await.unwrap().is_none());
        assert!(!store.exists(hash, "Core.xcframework").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_artifact_is_a_miss() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"Core");
        let path = store.artifact_path(hash, "Core.xcframework");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage data").unwrap();
        assert!(store.fetch(hash, "Core.xcframework").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_overwrites_and_leaves_no_temporaries() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"Core");
        store.store(hash, &Artifact::new("Core.xcframework", "v1")).await.unwrap();
        store.store(hash, &Artifact::new("Core.xcframework", "v2")).await.unwrap();

        let fetched = store.fetch(hash, "Core.xcframework").await.unwrap().unwrap();
        assert_eq!(fetched.data, Bytes::from("v2"));
        let entries: Vec<_> = std::fs::read_dir(store.cache_dir().join(hash.to_string()))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"Core");
        let err = store.store(hash, &Artifact::new("../escape", "x")).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidArtifactName { .. }));
    }

    #[test]
    fn artifact_path_format() {
        let (_dir, store) = make_store();
        let hash = ContentHash::from_bytes(b"Core");
        let path = store.artifact_path(hash, "Core.xcframework");
        assert!(path.ends_with(format!("{hash}/Core.xcframework.kiln")));
    }

    #[tokio::test]
    async fn gc_removes_dead_hashes_only() {
        let (_dir, store) = make_store();
        let live = ContentHash::from_bytes(b"live");
        let dead = ContentHash::from_bytes(b"dead");
        store.store(live, &Artifact::new("A.xcframework", "a")).await.unwrap();
        store.store(dead, &Artifact::new("B.xcframework", "b")).await.unwrap();
        std::fs::create_dir_all(store.cache_dir().join("not-a-hash")).unwrap();

        let removed = store.gc(&BTreeSet::from([live])).unwrap();
        assert_eq!(removed, 1);
        assert!(store.exists(live, "A.xcframework").await.unwrap());
        assert!(!store.exists(dead, "B.xcframework").await.unwrap());
        assert!(store.cache_dir().join("not-a-hash").exists());
    }

    #[test]
    fn gc_missing_dir_returns_zero() {
        let store = LocalCacheStorage::new("/nonexistent/kiln/cache");
        assert_eq!(store.gc(&BTreeSet::new()).unwrap(), 0);
    }
}
