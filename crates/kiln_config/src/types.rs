//! Configuration types deserialized from `kiln.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default local cache directory, relative to the project root.
pub const DEFAULT_CACHE_DIRECTORY: &str = ".kiln/cache";

/// The root configuration structure for a `kiln.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct KilnConfig {
    /// Project identity.
    pub project: ProjectSection,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// The `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project name.
    pub name: String,
    /// `<organization>/<project>` handle identifying the project on the remote cache.
    #[serde(default)]
    pub full_handle: Option<String>,
}

/// The `[cache]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Local cache directory; relative paths resolve against the project root.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Profile used when none is requested explicitly.
    #[serde(default)]
    pub default_profile: Option<String>,
    /// Remote cache, if any.
    #[serde(default)]
    pub remote: Option<RemoteCacheConfig>,
    /// Named cache profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl CacheConfig {
    /// The local cache directory for a project rooted at `project_root`.
    pub fn directory(&self, project_root: &Path) -> PathBuf {
        let dir = self
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY));
        if dir.is_absolute() {
            dir
        } else {
            project_root.join(dir)
        }
    }
}

/// The `[cache.remote]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCacheConfig {
    /// Base URL of the cache server.
    pub url: String,
    /// When `true`, a missing authentication token is fatal instead of
    /// degrading to the local cache only.
    #[serde(default)]
    pub required: bool,
    /// Retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

/// A `[cache.profiles.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    /// Build configuration, e.g. `Debug`.
    pub configuration: String,
    /// Architectures to build.
    #[serde(default)]
    pub architectures: Vec<String>,
    /// Extra build settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}
