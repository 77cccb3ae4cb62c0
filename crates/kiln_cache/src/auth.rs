//! Authentication token resolution for the remote cache.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CacheError;

/// Environment variable read by [`EnvTokenProvider::default`].
pub const TOKEN_ENV_VAR: &str = "KILN_TOKEN";

/// A bearer token for the remote cache.
///
/// The `Debug` rendering never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Resolves the token used to talk to a cache server.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Returns the token for `server_url`, or `None` if the user is not
    /// authenticated against it.
    async fn authentication_token(&self, server_url: &str) -> Result<Option<Token>, CacheError>;
}

/// Reads the token from an environment variable, as CI setups do.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    variable: String,
}

impl EnvTokenProvider {
    /// Reads `variable` instead of [`TOKEN_ENV_VAR`].
    pub fn with_variable(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::with_variable(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl AuthenticationProvider for EnvTokenProvider {
    async fn authentication_token(&self, _server_url: &str) -> Result<Option<Token>, CacheError> {
        Ok(std::env::var(&self.variable)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Token))
    }
}

#[derive(Deserialize)]
struct Credentials {
    token: String,
}

/// Reads `<directory>/<host>.json` files written by an interactive login.
#[derive(Debug, Clone)]
pub struct CredentialsFileProvider {
    directory: PathBuf,
}

impl CredentialsFileProvider {
    /// Looks for credentials under `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn credentials_path(&self, server_url: &str) -> Result<PathBuf, CacheError> {
        let url = reqwest::Url::parse(server_url).map_err(|e| CacheError::Authentication {
            reason: format!("invalid server URL '{server_url}': {e}"),
        })?;
        let host = url.host_str().ok_or_else(|| CacheError::Authentication {
            reason: format!("server URL '{server_url}' has no host"),
        })?;
        Ok(self.directory.join(format!("{host}.json")))
    }
}

#[async_trait]
impl AuthenticationProvider for CredentialsFileProvider {
    async fn authentication_token(&self, server_url: &str) -> Result<Option<Token>, CacheError> {
        let path = self.credentials_path(server_url)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let credentials: Credentials =
            serde_json::from_str(&text).map_err(|e| CacheError::Authentication {
                reason: format!("{}: {e}", path.display()),
            })?;
        tracing::debug!(path = %path.display(), "using stored credentials");
        Ok(Some(Token(credentials.token)).filter(|t| !t.0.is_empty()))
    }
}

/// Tries each provider in order; the first token found wins.
#[derive(Default, Clone)]
pub struct ChainedTokenProvider {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
}

impl ChainedTokenProvider {
    /// Creates a chain from `providers`.
    pub fn new(providers: Vec<Arc<dyn AuthenticationProvider>>) -> Self {
        Self { providers }
    }

    /// `KILN_TOKEN` first, then stored credentials under `credentials_dir`.
    pub fn standard(credentials_dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Arc::new(EnvTokenProvider::default()),
            Arc::new(CredentialsFileProvider::new(credentials_dir)),
        ])
    }
}

#[async_trait]
impl AuthenticationProvider for ChainedTokenProvider {
    async fn authentication_token(&self, server_url: &str) -> Result<Option<Token>, CacheError> {
        for provider in &self.providers {
            if let Some(token) = provider.authentication_token(server_url).await? {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}
