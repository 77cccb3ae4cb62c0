use std::collections::BTreeSet;

use kiln_graph::{Graph, GraphTarget, TargetDependency};

use crate::error::MapperError;
use crate::mapper::{GraphMapper, Mapped};

/// Removes targets whose metadata sets `prune`, along with every dependency
/// and scheme entry that points at them.
///
/// The graph is rebuilt from its manifest, so the result is validated again.
#[derive(Debug, Default, Clone, Copy)]
pub struct PruneTargetsGraphMapper;

impl GraphMapper for PruneTargetsGraphMapper {
    fn name(&self) -> &str {
        "prune-targets"
    }

    fn map(&self, graph: Graph) -> Result<Mapped<Graph>, MapperError> {
        let pruned: BTreeSet<GraphTarget> = graph
            .targets()
            .filter(|t| graph.target(t).is_some_and(|d| d.metadata.prune))
            .cloned()
            .collect();
        if pruned.is_empty() {
            return Ok((graph, Vec::new()));
        }
        tracing::debug!(count = pruned.len(), "pruning targets");

        let mut manifest = graph.to_manifest();
        for project in &mut manifest.projects {
            let project_path = project.path.clone();
            project.targets.retain(|t| {
                !pruned.contains(&GraphTarget::new(project_path.clone(), t.name.clone()))
            });

            let points_at_pruned = |dependency: &TargetDependency| match dependency {
                TargetDependency::Target { name } => {
                    pruned.contains(&GraphTarget::new(project_path.clone(), name.clone()))
                }
                TargetDependency::Project { target, path } => {
                    let path = if path.is_absolute() {
                        path.clone()
                    } else {
                        project_path.join(path)
                    };
                    pruned.contains(&GraphTarget::new(path, target.clone()))
                }
                _ => false,
            };
            for target in &mut project.targets {
                target.dependencies.retain(|d| !points_at_pruned(d));
            }
            for scheme in &mut project.schemes {
                scheme.build_targets.retain(|r| {
                    !pruned.contains(&GraphTarget::new(r.project_path.clone(), r.name.clone()))
                });
            }
        }

        Ok((manifest.build()?, Vec::new()))
    }
}
