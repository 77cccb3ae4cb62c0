//! Cache warming: build every cacheable target that is not cached yet.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kiln_common::{CacheOutputType, CacheProfile, ContentHash};
use kiln_graph::{Graph, GraphTarget};

use crate::artifact::{artifact_name, Artifact};
use crate::chain::CacheStorageChain;
use crate::error::CacheError;

/// Produces the artifact of a target. Implemented by the build system.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Builds `target` for `profile`, returning the artifact to cache.
    async fn build(
        &self,
        target: &GraphTarget,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<Artifact, CacheError>;
}

/// Shared flag that stops a warm run from scheduling further work.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which targets a warm run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmOptions {
    /// Target names to warm, with their transitive dependencies. Empty means
    /// every cacheable target.
    pub targets: Vec<String>,
    /// Warm only the dependencies of `targets`, not the targets themselves.
    pub dependencies_only: bool,
}

/// Outcome of a warm run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmSummary {
    /// Targets that were already cached.
    pub cached: Vec<GraphTarget>,
    /// Targets built and stored by this run.
    pub built: Vec<GraphTarget>,
    /// Selected dependencies that have no cache key.
    pub skipped: Vec<GraphTarget>,
    /// Whether the run stopped early because of cancellation.
    pub cancelled: bool,
}

/// Fills the cache for a graph.
pub struct CacheWarmer {
    chain: CacheStorageChain,
    builder: Arc<dyn ArtifactBuilder>,
    cancellation: CancellationFlag,
}

impl CacheWarmer {
    /// Creates a warmer storing into `chain`.
    pub fn new(chain: CacheStorageChain, builder: Arc<dyn ArtifactBuilder>) -> Self {
        Self {
            chain,
            builder,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Uses `flag` to observe cancellation.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Builds and stores every selected cacheable target missing from the cache.
    ///
    /// `hashes` holds the cache keys of the cacheable targets, as computed by
    /// the graph content hasher. Targets are processed in topological order
    /// so dependencies are cached before their dependents. A failure to
    /// build or to store locally aborts the run.
    pub async fn warm(
        &self,
        graph: &Graph,
        hashes: &BTreeMap<GraphTarget, ContentHash>,
        profile: &CacheProfile,
        output_type: CacheOutputType,
        options: &WarmOptions,
    ) -> Result<WarmSummary, CacheError> {
        let selected = select_targets(graph, hashes, options)?;
        let mut summary = WarmSummary::default();

        let mut missing = Vec::new();
        for target in graph.topological_order() {
            if !selected.contains(target) {
                continue;
            }
            let Some(&hash) = hashes.get(target) else {
                summary.skipped.push(target.clone());
                continue;
            };
            if self.cancellation.is_cancelled() {
                summary.cancelled = true;
                return Ok(summary);
            }
            let name = artifact_name(target, output_type);
            if self.chain.exists(hash, &name).await? {
                tracing::debug!(target = %target, %hash, "already cached");
                summary.cached.push(target.clone());
            } else {
                missing.push((target, hash, name));
            }
        }

        let total = missing.len();
        for (i, (target, hash, name)) in missing.into_iter().enumerate() {
            if self.cancellation.is_cancelled() {
                tracing::info!("cache warming cancelled after {i} of {total} targets");
                summary.cancelled = true;
                return Ok(summary);
            }
            tracing::info!(
                "Building cacheable targets: {}, {} out of {}",
                target.name,
                i + 1,
                total
            );
            let mut artifact = self.builder.build(target, profile, output_type).await?;
            artifact.name = name;
            self.chain.store(hash, &artifact).await?;
            summary.built.push(target.clone());
        }
        Ok(summary)
    }
}

fn select_targets(
    graph: &Graph,
    hashes: &BTreeMap<GraphTarget, ContentHash>,
    options: &WarmOptions,
) -> Result<BTreeSet<GraphTarget>, CacheError> {
    if options.targets.is_empty() {
        return Ok(hashes.keys().cloned().collect());
    }

    let mut named = BTreeSet::new();
    for name in &options.targets {
        let matches: Vec<&GraphTarget> = graph
            .targets_named(name)
            .filter(|t| hashes.contains_key(*t))
            .collect();
        if matches.is_empty() {
            return Err(CacheError::NotCacheable { name: name.clone() });
        }
        named.extend(matches.into_iter().cloned());
    }

    let mut selected = BTreeSet::new();
    for target in &named {
        selected.extend(graph.transitive_target_dependencies(target));
    }
    if options.dependencies_only {
        selected.retain(|t| !named.contains(t));
    } else {
        selected.extend(named);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::{Product, Project, Target, TargetDependency};

    fn framework(name: &str, deps: &[&str]) -> Target {
        let mut target = Target::new(name, Product::Framework);
        target.dependencies = deps
            .iter()
            .map(|d| TargetDependency::Target { name: d.to_string() })
            .collect();
        target
    }

    fn graph() -> Graph {
        let mut app = Target::new("App", Product::App);
        app.dependencies = vec![TargetDependency::Target {
            name: "Feature".into(),
        }];
        let project = Project::new(
            "/work/App",
            "App",
            vec![
                framework("Base", &[]),
                framework("Core", &["Base"]),
                framework("Feature", &["Core"]),
                app,
            ],
        );
        Graph::new("App", "/work/App", vec![project]).unwrap()
    }

    fn hashes(graph: &Graph) -> BTreeMap<GraphTarget, ContentHash> {
        graph
            .targets()
            .filter(|t| t.name != "App")
            .map(|t| (t.clone(), ContentHash::from_str_content(&t.name)))
            .collect()
    }

    fn names(targets: &BTreeSet<GraphTarget>) -> Vec<&str> {
        targets.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn all_cacheable_targets_by_default() {
        let graph = graph();
        let selected = select_targets(&graph, &hashes(&graph), &WarmOptions::default()).unwrap();
        assert_eq!(names(&selected), vec!["Base", "Core", "Feature"]);
    }

    #[test]
    fn named_targets_include_dependencies() {
        let graph = graph();
        let options = WarmOptions {
            targets: vec!["Core".into()],
            dependencies_only: false,
        };
        let selected = select_targets(&graph, &hashes(&graph), &options).unwrap();
        assert_eq!(names(&selected), vec!["Base", "Core"]);
    }

    #[test]
    fn dependencies_only_drops_named_targets() {
        let graph = graph();
        let options = WarmOptions {
            targets: vec!["Feature".into()],
            dependencies_only: true,
        };
        let selected = select_targets(&graph, &hashes(&graph), &options).unwrap();
        assert_eq!(names(&selected), vec!["Base", "Core"]);
    }

    #[test]
    fn non_cacheable_name_is_rejected() {
        let graph = graph();
        let options = WarmOptions {
            targets: vec!["App".into()],
            dependencies_only: false,
        };
        let err = select_targets(&graph, &hashes(&graph), &options).unwrap_err();
        assert!(matches!(err, CacheError::NotCacheable { name } if name == "App"));
    }

    #[test]
    fn cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
