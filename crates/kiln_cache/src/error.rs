//! Error types for cache operations.

use std::path::PathBuf;

use kiln_common::{ErrorKind, FatalError};
use kiln_config::ConfigError;

/// Failure reported by a remote transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Worth retrying: timeouts, connection failures, 5xx and 429 responses.
    #[error("transient remote cache failure: {0}")]
    Transient(String),

    /// Retrying will not help: authentication failures, malformed requests.
    #[error("remote cache request failed: {0}")]
    Permanent(String),

    /// The artifact does not exist remotely.
    #[error("artifact not found")]
    NotFound,
}

/// Errors that can occur during cache operations.
///
/// Local reads are fail-safe and never produce these: a corrupt or missing
/// artifact is a cache miss. Remote failures are surfaced as
/// [`CacheError::Remote`] and downgraded to warnings by
/// [`CacheStorageChain`](crate::CacheStorageChain).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// An artifact name cannot be used as a file name.
    #[error("invalid artifact name '{name}'")]
    InvalidArtifactName {
        /// The rejected name.
        name: String,
    },

    /// The remote cache is required but no authentication token was found.
    #[error("the remote cache at {url} requires authentication; set KILN_TOKEN or log in")]
    AuthenticationRequired {
        /// The remote cache URL.
        url: String,
    },

    /// Credentials exist but could not be read.
    #[error("failed to read credentials: {reason}")]
    Authentication {
        /// Description of the failure.
        reason: String,
    },

    /// A remote operation failed after retries.
    #[error("remote cache {operation} failed: {source}")]
    Remote {
        /// The operation, e.g. `download`.
        operation: &'static str,
        /// The last transport failure.
        source: TransportError,
    },

    /// The configuration is invalid for cache resolution.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A requested target has no cache key.
    #[error("target '{name}' is not cacheable (only frameworks without test dependencies are)")]
    NotCacheable {
        /// The requested target name.
        name: String,
    },

    /// Building an artifact failed.
    #[error("failed to build '{target}': {reason}")]
    Build {
        /// The target being built.
        target: String,
        /// Description of the failure.
        reason: String,
    },

    /// A background task panicked or was cancelled by the runtime.
    #[error("internal error: cache task failed: {reason}")]
    Task {
        /// Description of the failure.
        reason: String,
    },
}

impl FatalError for CacheError {
    fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Task { .. } => ErrorKind::Bug,
            CacheError::Config(inner) => inner.kind(),
            _ => ErrorKind::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/abc/Core.kiln"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("Core.kiln"));
    }

    #[test]
    fn authentication_required_names_url() {
        let err = CacheError::AuthenticationRequired {
            url: "https://cache.example.com".into(),
        };
        assert!(err.to_string().contains("https://cache.example.com"));
        assert_eq!(err.kind(), ErrorKind::Abort);
    }

    #[test]
    fn remote_error_wraps_transport() {
        let err = CacheError::Remote {
            operation: "upload",
            source: TransportError::Transient("503 Service Unavailable".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("upload"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn task_failure_is_a_bug() {
        let err = CacheError::Task {
            reason: "panicked".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Bug);
    }
}
