//! Cache keys for every cacheable target of a graph.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;
use kiln_common::{CacheOutputType, CacheProfile, ContentHash};
use kiln_graph::{Graph, GraphDependency, GraphTarget, Settings, Target};
use rayon::prelude::*;

use crate::content::ContentHasher;
use crate::error::HashError;
use crate::target::{TargetContentHash, TargetContentHasher};

type MemoKey = (GraphTarget, ContentHash, CacheOutputType);

/// What a memoized key was computed from. A hit is only reused when the
/// target definition, its project settings and its dependency keys are
/// unchanged, so one hasher can be reused across mapped graphs.
#[derive(PartialEq, Eq)]
struct MemoInputs {
    definition: Target,
    project_settings: Settings,
    dependencies: Vec<(GraphTarget, ContentHash)>,
}

struct MemoEntry {
    inputs: MemoInputs,
    detail: TargetContentHash,
}

/// Computes cache keys for the cacheable targets of a graph.
///
/// Only framework targets that do not (transitively) depend on something
/// test-only are cacheable. Their dependencies are hashed too, because a
/// target's key folds in the keys of its dependencies, but they are not part
/// of the result.
///
/// Targets are hashed level by level along [`Graph::levels`]; targets within
/// a level are independent and are hashed in parallel. Any failure aborts the
/// whole run.
pub struct GraphContentHasher {
    target_hasher: TargetContentHasher,
    pool: Option<rayon::ThreadPool>,
    memo: DashMap<MemoKey, MemoEntry>,
}

impl GraphContentHasher {
    /// Creates a graph hasher using the global rayon pool.
    pub fn new(hasher: Arc<ContentHasher>) -> Self {
        Self {
            target_hasher: TargetContentHasher::new(hasher),
            pool: None,
            memo: DashMap::new(),
        }
    }

    /// Bounds hashing to a dedicated pool of `workers` threads.
    pub fn with_max_workers(mut self, workers: usize) -> Result<Self, HashError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("kiln-hash-{i}"))
            .build()
            .map_err(|e| HashError::WorkerPool {
                reason: e.to_string(),
            })?;
        self.pool = Some(pool);
        Ok(self)
    }

    /// Appends caller-supplied strings to every key.
    pub fn with_additional_strings(mut self, strings: Vec<String>) -> Self {
        self.target_hasher = self.target_hasher.with_additional_strings(strings);
        self
    }

    /// Targets whose artifacts can be cached.
    pub fn cacheable_targets(&self, graph: &Graph) -> BTreeSet<GraphTarget> {
        let test_only = |dep: &GraphDependency| graph.is_test_only(dep);
        graph
            .targets()
            .filter(|target| {
                graph
                    .target(target)
                    .is_some_and(|t| t.product.is_framework() && !t.metadata.testing_only)
            })
            .filter(|target| !graph.depends_on(target, test_only))
            .cloned()
            .collect()
    }

    /// Cache keys of every cacheable target.
    pub fn content_hashes(
        &self,
        graph: &Graph,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<BTreeMap<GraphTarget, ContentHash>, HashError> {
        Ok(self
            .content_hashes_detailed(graph, profile, output_type)?
            .into_iter()
            .map(|(target, detail)| (target, detail.hash))
            .collect())
    }

    /// Cache keys of every cacheable target, with their fragments.
    pub fn content_hashes_detailed(
        &self,
        graph: &Graph,
        profile: &CacheProfile,
        output_type: CacheOutputType,
    ) -> Result<BTreeMap<GraphTarget, TargetContentHash>, HashError> {
        let cacheable = self.cacheable_targets(graph);
        let mut needed = cacheable.clone();
        for target in &cacheable {
            needed.extend(graph.transitive_target_dependencies(target));
        }

        let profile_hash = self.target_hasher.profile_hash(profile);
        let run = || -> Result<BTreeMap<GraphTarget, TargetContentHash>, HashError> {
            let mut hashes = BTreeMap::new();
            let mut details = BTreeMap::new();
            for level in graph.levels() {
                let batch: Vec<&GraphTarget> =
                    level.into_iter().filter(|t| needed.contains(*t)).collect();
                let computed = batch
                    .par_iter()
                    .map(|target| {
                        self.hash_memoized(
                            graph,
                            target,
                            &hashes,
                            profile,
                            profile_hash,
                            output_type,
                        )
                        .map(|detail| ((*target).clone(), detail))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                for (target, detail) in computed {
                    hashes.insert(target.clone(), detail.hash);
                    details.insert(target, detail);
                }
            }
            Ok(details)
        };

        let mut details = match &self.pool {
            Some(pool) => pool.install(run)?,
            None => run()?,
        };
        details.retain(|target, _| cacheable.contains(target));

        tracing::info!(
            graph = graph.name(),
            profile = %profile.name,
            output_type = %output_type,
            cacheable = details.len(),
            "computed target hashes"
        );
        Ok(details)
    }

    fn hash_memoized(
        &self,
        graph: &Graph,
        target: &GraphTarget,
        dependency_hashes: &BTreeMap<GraphTarget, ContentHash>,
        profile: &CacheProfile,
        profile_hash: ContentHash,
        output_type: CacheOutputType,
    ) -> Result<TargetContentHash, HashError> {
        let key = (target.clone(), profile_hash, output_type);
        let inputs = memo_inputs(graph, target, dependency_hashes);
        if let (Some(inputs), Some(hit)) = (&inputs, self.memo.get(&key)) {
            if hit.inputs == *inputs {
                return Ok(hit.detail.clone());
            }
        }
        let detail = self.target_hasher.hash_target(
            graph,
            target,
            dependency_hashes,
            profile,
            output_type,
        )?;
        tracing::debug!(target = %target, hash = %detail.hash, "hashed target");
        if let Some(inputs) = inputs {
            self.memo.insert(
                key,
                MemoEntry {
                    inputs,
                    detail: detail.clone(),
                },
            );
        }
        Ok(detail)
    }
}

fn memo_inputs(
    graph: &Graph,
    target: &GraphTarget,
    dependency_hashes: &BTreeMap<GraphTarget, ContentHash>,
) -> Option<MemoInputs> {
    let project = graph.project(&target.path)?;
    let definition = graph.target(target)?;
    let dependencies = graph
        .dependencies(target)
        .iter()
        .filter_map(|dependency| match dependency {
            GraphDependency::Target(dep) => dependency_hashes.get(dep).map(|h| (dep.clone(), *h)),
            _ => None,
        })
        .collect();
    Some(MemoInputs {
        definition: definition.clone(),
        project_settings: project.settings.clone(),
        dependencies,
    })
}
