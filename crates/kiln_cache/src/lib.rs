//! Layered artifact cache for kiln.
//!
//! Artifacts are stored under the content hash of the target that produced
//! them. A [`CacheStorageProvider`] resolves the active backends (always a
//! [`LocalCacheStorage`], plus a [`RemoteCacheStorage`] when a remote cache is
//! configured and authenticated), and a [`CacheStorageChain`] fetches and
//! stores across them:
//!
//! - fetches are local first; a remote hit is copied into the local cache
//! - stores go to every backend
//! - remote failures are logged and degrade to misses, local failures abort
//!
//! [`CacheWarmer`] builds and stores every cacheable target that is missing.

#![warn(missing_docs)]

pub mod artifact;
pub mod auth;
pub mod chain;
pub mod error;
pub mod local;
pub mod provider;
pub mod remote;
pub mod retry;
pub mod storage;
pub mod transport;
pub mod warmer;

pub use artifact::{artifact_name, Artifact, ArtifactHeader};
pub use auth::{
    AuthenticationProvider, ChainedTokenProvider, CredentialsFileProvider, EnvTokenProvider, Token,
    TOKEN_ENV_VAR,
};
pub use chain::CacheStorageChain;
pub use error::{CacheError, TransportError};
pub use local::LocalCacheStorage;
pub use provider::{CacheStorageProvider, TransportFactory};
pub use remote::RemoteCacheStorage;
pub use retry::RetryPolicy;
pub use storage::{CacheStorage, StorageKind};
pub use transport::{HttpTransport, RemoteTransport};
pub use warmer::{ArtifactBuilder, CacheWarmer, CancellationFlag, WarmOptions, WarmSummary};
