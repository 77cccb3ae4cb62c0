//! Build settings hashing.

use kiln_common::ContentHash;
use kiln_graph::{Settings, SettingsDictionary};

use crate::content::ContentHasher;
use crate::error::HashError;

/// Hashes a settings dictionary as a canonical (key-sorted) dictionary.
pub fn hash_dictionary(hasher: &ContentHasher, settings: &SettingsDictionary) -> ContentHash {
    hasher.hash_dictionary(settings.iter().map(|(k, v)| (k.as_str(), v.render())))
}

/// Hashes base settings followed by every configuration, sorted by name.
///
/// Each configuration contributes its name, variant, settings dictionary
/// hash and, when set, the content hash of its xcconfig file.
pub fn hash_settings(
    hasher: &ContentHasher,
    settings: &Settings,
) -> Result<ContentHash, HashError> {
    let mut fragments = vec![hash_dictionary(hasher, &settings.base).to_string()];
    for (name, configuration) in &settings.configurations {
        fragments.push(name.clone());
        fragments.push(configuration.variant.as_str().to_string());
        fragments.push(hash_dictionary(hasher, &configuration.settings).to_string());
        if let Some(xcconfig) = &configuration.xcconfig {
            fragments.push(hasher.hash_path(xcconfig)?.to_string());
        }
    }
    Ok(hasher.hash_strings(&fragments))
}
