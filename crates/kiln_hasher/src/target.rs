//! Cache key of a single target.
//!
//! The key is the string-list hash of these fragments, in this order:
//!
//! 1. sources
//! 2. resources
//! 3. settings (target, then project)
//! 4. copy-files phases
//! 5. dependency hashes, sorted by dependency name
//! 6. cache profile
//! 7. output type discriminator
//! 8. scripts, headers, environment
//! 9. target identity (name, product, platform, bundle id)
//! 10. any additional strings
//!
//! The order is part of the on-disk cache contract. Changing it invalidates
//! every stored artifact.

use std::collections::BTreeMap;
use std::sync::Arc;

use kiln_common::{CacheOutputType, CacheProfile, ContentHash};
use kiln_graph::{Graph, GraphDependency, GraphTarget, Project, Target};

use crate::content::ContentHasher;
use crate::error::HashError;
use crate::files;
use crate::settings;

/// Every fragment that went into a target's key, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSubhashes {
    /// Sorted sources.
    pub sources: ContentHash,
    /// Sorted resources.
    pub resources: ContentHash,
    /// Target and project settings.
    pub settings: ContentHash,
    /// Copy-files phases in declaration order.
    pub copy_files: ContentHash,
    /// Dependency hashes sorted by name.
    pub dependencies: ContentHash,
    /// Cache profile.
    pub profile: ContentHash,
    /// Output type discriminator.
    pub output_type: CacheOutputType,
    /// Script phases in declaration order.
    pub scripts: ContentHash,
    /// Header lists.
    pub headers: ContentHash,
    /// Environment variables.
    pub environment: ContentHash,
    /// Name, product, platform and bundle id.
    pub identity: ContentHash,
}

/// A target's cache key together with its fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContentHash {
    /// The cache key.
    pub hash: ContentHash,
    /// The fragments combined into `hash`.
    pub subhashes: TargetSubhashes,
}

/// Computes the cache key of one target given the keys of its dependencies.
#[derive(Clone)]
pub struct TargetContentHasher {
    hasher: Arc<ContentHasher>,
    additional_strings: Vec<String>,
}

impl TargetContentHasher {
    /// Creates a target hasher on top of a shared content hasher.
    pub fn new(hasher: Arc<ContentHasher>) -> Self {
        Self {
            hasher,
            additional_strings: Vec::new(),
        }
    }

    /// Appends caller-supplied strings (e.g. a tool version) to every key.
    pub fn with_additional_strings(mut self, strings: Vec<String>) -> Self {
        self.additional_strings = strings;
        self
    }

    /// The underlying content hasher.
    pub fn content_hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    /// Hashes a cache profile: name, configuration, sorted architectures and settings.
    pub fn profile_hash(&self, profile: &CacheProfile) -> ContentHash {
        let mut architectures = profile.architectures.clone();
        architectures.sort();
        let mut fragments = vec![profile.name.clone(), profile.configuration.clone()];
        fragments.extend(architectures);
        fragments.push(self.hasher.hash_dictionary(&profile.settings).to_string());
        self.hasher.hash_strings(&fragments)
    }

    /// Computes the key of `target`.
    ///
    /// `dependency_hashes` must already hold the key of every target the
    /// target depends on; a missing entry is reported as an internal error.
    /// Failures are wrapped in [`HashError::Target`] naming the target.
    pub fn hash_target(
        &self,
        graph: &Graph,
        target: &GraphTarget,
        dependency_hashes: &BTreeMap<GraphTarget, ContentHash>,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<TargetContentHash, HashError> {
        self.compute(graph, target, dependency_hashes, profile, output_type)
            .map_err(|source| HashError::Target {
                target: target.name.clone(),
                project: target.path.clone(),
                source: Box::new(source),
            })
    }

    fn compute(
        &self,
        graph: &Graph,
        target: &GraphTarget,
        dependency_hashes: &BTreeMap<GraphTarget, ContentHash>,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<TargetContentHash, HashError> {
        let unknown = || HashError::UnknownTarget {
            target: target.name.clone(),
            project: target.path.clone(),
        };
        let project = graph.project(&target.path).ok_or_else(unknown)?;
        let definition = graph.target(target).ok_or_else(unknown)?;
        let hasher = &*self.hasher;

        let subhashes = TargetSubhashes {
            sources: files::hash_sources(hasher, &definition.sources)?,
            resources: files::hash_resources(hasher, &definition.resources)?,
            settings: self.settings_hash(project, definition)?,
            copy_files: files::hash_copy_files(hasher, &definition.copy_files)?,
            dependencies: self.dependencies_hash(
                graph.dependencies(target),
                target,
                dependency_hashes,
            )?,
            profile: self.profile_hash(profile),
            output_type,
            scripts: files::hash_scripts(hasher, &definition.scripts)?,
            headers: match &definition.headers {
                Some(headers) => files::hash_headers(hasher, headers)?,
                None => hasher.hash_str(""),
            },
            environment: hasher.hash_dictionary(&definition.environment),
            identity: identity_hash(hasher, definition),
        };

        let mut fragments = vec![
            subhashes.sources.to_string(),
            subhashes.resources.to_string(),
            subhashes.settings.to_string(),
            subhashes.copy_files.to_string(),
            subhashes.dependencies.to_string(),
            subhashes.profile.to_string(),
            output_type.as_str().to_string(),
            subhashes.scripts.to_string(),
            subhashes.headers.to_string(),
            subhashes.environment.to_string(),
            subhashes.identity.to_string(),
        ];
        fragments.extend(self.additional_strings.iter().cloned());

        Ok(TargetContentHash {
            hash: hasher.hash_strings(&fragments),
            subhashes,
        })
    }

    fn settings_hash(&self, project: &Project, target: &Target) -> Result<ContentHash, HashError> {
        let target_settings = settings::hash_settings(&self.hasher, &target.settings)?;
        let project_settings = settings::hash_settings(&self.hasher, &project.settings)?;
        Ok(self
            .hasher
            .hash_strings(&[target_settings.to_string(), project_settings.to_string()]))
    }

    fn dependencies_hash(
        &self,
        dependencies: &[GraphDependency],
        target: &GraphTarget,
        dependency_hashes: &BTreeMap<GraphTarget, ContentHash>,
    ) -> Result<ContentHash, HashError> {
        let mut named = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let hash = match dependency {
                GraphDependency::Target(dep) => {
                    *dependency_hashes
                        .get(dep)
                        .ok_or_else(|| HashError::MissingDependencyHash {
                            target: target.name.clone(),
                            dependency: dep.name.clone(),
                        })?
                }
                GraphDependency::Framework { path }
                | GraphDependency::Xcframework { path }
                | GraphDependency::Library { path } => self.hasher.hash_path(path)?,
                GraphDependency::Sdk { name, optional } => {
                    let status = if *optional { "optional" } else { "required" };
                    self.hasher.hash_str(&format!("sdk:{name}:{status}"))
                }
                GraphDependency::Package { product } => {
                    self.hasher.hash_str(&format!("package:{product}"))
                }
            };
            named.push((dependency.name(), hash));
        }
        named.sort();
        let hashes: Vec<String> = named.into_iter().map(|(_, hash)| hash.to_string()).collect();
        Ok(self.hasher.hash_strings(&hashes))
    }
}

fn identity_hash(hasher: &ContentHasher, target: &Target) -> ContentHash {
    hasher.hash_strings(&[
        target.name.clone(),
        target.product.as_str().to_string(),
        target.platform.as_str().to_string(),
        target.bundle_id.clone(),
    ])
}
