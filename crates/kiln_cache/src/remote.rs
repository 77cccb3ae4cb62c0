//! Remote cache backend.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_common::ContentHash;

use crate::artifact::{self, Artifact};
use crate::error::{CacheError, TransportError};
use crate::retry::RetryPolicy;
use crate::storage::{CacheStorage, StorageKind};
use crate::transport::RemoteTransport;

/// A [`CacheStorage`] on a cache server, scoped to one project handle.
pub struct RemoteCacheStorage {
    transport: Arc<dyn RemoteTransport>,
    handle: String,
    retry: RetryPolicy,
}

impl RemoteCacheStorage {
    /// Creates a backend for the project `handle` (`<organization>/<project>`).
    pub fn new(
        transport: Arc<dyn RemoteTransport>,
        handle: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            handle: handle.into(),
            retry,
        }
    }

    /// Project handle artifacts are scoped to.
    pub fn handle(&self) -> &str {
        &self.handle
    }
}

#[async_trait]
impl CacheStorage for RemoteCacheStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Remote
    }

    async fn fetch(&self, hash: ContentHash, name: &str) -> Result<Option<Artifact>, CacheError> {
        artifact::validate_name(name)?;
        let result = self
            .retry
            .run("download", || self.transport.download(&self.handle, hash, name))
            .await;
        match result {
            Ok(data) => Ok(Some(Artifact::new(name, data))),
            Err(TransportError::NotFound) => Ok(None),
            Err(source) => Err(CacheError::Remote {
                operation: "download",
                source,
            }),
        }
    }

    async fn store(&self, hash: ContentHash, artifact: &Artifact) -> Result<(), CacheError> {
        artifact::validate_name(&artifact.name)?;
        self.retry
            .run("upload", || {
                self.transport
                    .upload(&self.handle, hash, &artifact.name, artifact.data.clone())
            })
            .await
            .map_err(|source| CacheError::Remote {
                operation: "upload",
                source,
            })
    }

    async fn exists(&self, hash: ContentHash, name: &str) -> Result<bool, CacheError> {
        artifact::validate_name(name)?;
        let result = self
            .retry
            .run("exists", || self.transport.exists(&self.handle, hash, name))
            .await;
        match result {
            Ok(found) => Ok(found),
            Err(TransportError::NotFound) => Ok(false),
            Err(source) => Err(CacheError::Remote {
                operation: "exists",
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeTransport {
        objects: Mutex<HashMap<String, Bytes>>,
        failures: Mutex<Vec<TransportError>>,
    }

    impl FakeTransport {
        fn key(handle: &str, hash: ContentHash, name: &str) -> String {
            format!("{handle}/{hash}/{name}")
        }

        fn next_failure(&self) -> Option<TransportError> {
            self.failures.lock().unwrap().pop()
        }
    }

    #[async_trait]
    impl RemoteTransport for FakeTransport {
        async fn exists(
            &self,
            handle: &str,
            hash: ContentHash,
            name: &str,
        ) -> Result<bool, TransportError> {
            if let Some(e) = self.next_failure() {
                return Err(e);
            }
            Ok(self.objects.lock().unwrap().contains_key(&Self::key(handle, hash, name)))
        }

        async fn download(
            &self,
            handle: &str,
            hash: ContentHash,
            name: &str,
        ) -> Result<Bytes, TransportError> {
            if let Some(e) = self.next_failure() {
                return Err(e);
            }
            self.objects
                .lock()
                .unwrap()
                .get(&Self::key(handle, hash, name))
                .cloned()
                .ok_or(TransportError::NotFound)
        }

        async fn upload(
            &self,
            handle: &str,
            hash: ContentHash,
            name: &str,
            data: Bytes,
        ) -> Result<(), TransportError> {
            if let Some(e) = self.next_failure() {
                return Err(e);
            }
            self.objects
                .lock()
                .unwrap()
                .insert(Self::key(handle, hash, name), data);
            Ok(())
        }
    }

    fn storage(transport: Arc<FakeTransport>, max_retries: u32) -> RemoteCacheStorage {
        let retry = RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        RemoteCacheStorage::new(transport, "org/app", retry)
    }

    #[tokio::test]
    async fn upload_then_download() {
        let transport = Arc::new(FakeTransport::default());
        let remote = storage(transport.clone(), 0);
        let hash = ContentHash::from_bytes(b"Core");

        remote
            .store(hash, &Artifact::new("Core.xcframework", "payload"))
            .await
            .unwrap();
        assert!(remote.exists(hash, "Core.xcframework").await.unwrap());
        let fetched = remote.fetch(hash, "Core.xcframework").await.unwrap().unwrap();
        assert_eq!(fetched.data, Bytes::from("payload"));
        assert!(transport
            .objects
            .lock()
            .unwrap()
            .contains_key(&format!("org/app/{hash}/Core.xcframework")));
    }

    #[tokio::test]
    async fn not_found_is_a_miss() {
        let remote = storage(Arc::new(FakeTransport::default()), 0);
        let hash = ContentHash::from_bytes(b"Core");
        assert!(remote.fetch(hash, "Core.xcframework").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transient_failure_recovers_within_retries() {
        let transport = Arc::new(FakeTransport::default());
        transport
            .failures
            .lock()
            .unwrap()
            .push(TransportError::Transient("503".into()));
        let remote = storage(transport, 1);
        let hash = ContentHash::from_bytes(b"Core");
        remote
            .store(hash, &Artifact::new("Core.xcframework", "payload"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn permanent_failure_surfaces_as_remote_error() {
        let transport = Arc::new(FakeTransport::default());
        transport
            .failures
            .lock()
            .unwrap()
            .push(TransportError::Permanent("401 Unauthorized".into()));
        let remote = storage(transport, 3);
        let hash = ContentHash::from_bytes(b"Core");
        let err = remote.fetch(hash, "Core.xcframework").await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Remote {
                operation: "download",
                ..
            }
        ));
    }
}
