//! Cache profile resolution.

use kiln_common::CacheProfile;

use crate::error::ConfigError;
use crate::types::KilnConfig;

/// Name of the profile used when none is requested or configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Resolves the cache profile for a run.
///
/// The requested name wins, then `cache.default_profile`, then
/// [`DEFAULT_PROFILE`]. A project without any configured profiles has an
/// implicit `default` profile building the `Debug` configuration.
pub fn resolve_profile(
    config: &KilnConfig,
    requested: Option<&str>,
) -> Result<CacheProfile, ConfigError> {
    let name = requested
        .or(config.cache.default_profile.as_deref())
        .unwrap_or(DEFAULT_PROFILE);

    if let Some(profile) = config.cache.profiles.get(name) {
        return Ok(CacheProfile {
            name: name.to_string(),
            configuration: profile.configuration.clone(),
            architectures: profile.architectures.clone(),
            settings: profile.settings.clone(),
        });
    }
    if name == DEFAULT_PROFILE && config.cache.profiles.is_empty() {
        return Ok(CacheProfile::new(DEFAULT_PROFILE, "Debug"));
    }

    Err(ConfigError::UnknownProfile {
        name: name.to_string(),
        available: config.cache.profiles.keys().cloned().collect(),
    })
}
