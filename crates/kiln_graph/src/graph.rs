//! The resolved dependency graph.
//!
//! Targets are stored as nodes in an [`Arena`] and dependency edges are kept
//! as per-node lists indexed by [`TargetId`]. The constructor validates the
//! graph (no dangling references, no cycles) and precomputes a deterministic
//! topological layering that hashing and warming walk.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::arena::{Arena, ArenaId};
use crate::error::GraphError;
use crate::ids::TargetId;
use crate::model::{Project, Target, TargetDependency};

/// SDK names that only exist to support tests.
const TEST_SDKS: &[&str] = &["XCTest", "XCTest.framework", "Testing", "Testing.framework"];

/// Identity of a target in the graph: the declaring project's path plus the
/// target name. This is the key of every hash and cache map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphTarget {
    /// Path of the project declaring the target.
    pub path: PathBuf,
    /// Target name.
    pub name: String,
}

impl GraphTarget {
    /// Creates a target identity.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for GraphTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// A resolved dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphDependency {
    /// Another target in the graph.
    Target(GraphTarget),
    /// A precompiled framework.
    Framework {
        /// Absolute path.
        path: PathBuf,
    },
    /// A precompiled xcframework.
    Xcframework {
        /// Absolute path.
        path: PathBuf,
    },
    /// A precompiled library.
    Library {
        /// Absolute path.
        path: PathBuf,
    },
    /// A system SDK.
    Sdk {
        /// SDK name.
        name: String,
        /// Weakly linked.
        optional: bool,
    },
    /// A package product.
    Package {
        /// Product name.
        product: String,
    },
}

impl GraphDependency {
    /// The name dependency hashes are sorted by.
    pub fn name(&self) -> String {
        match self {
            GraphDependency::Target(target) => target.name.clone(),
            GraphDependency::Framework { path }
            | GraphDependency::Xcframework { path }
            | GraphDependency::Library { path } => file_name(path),
            GraphDependency::Sdk { name, .. } => name.clone(),
            GraphDependency::Package { product } => product.clone(),
        }
    }

    /// Returns the target identity for target edges.
    pub fn as_target(&self) -> Option<&GraphTarget> {
        match self {
            GraphDependency::Target(target) => Some(target),
            _ => None,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Serializable input form of a graph, as handed over by manifest loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphManifest {
    /// Graph name (usually the workspace name).
    pub name: String,
    /// Root path the graph was loaded from.
    pub path: PathBuf,
    /// Every loaded project.
    pub projects: Vec<Project>,
}

impl GraphManifest {
    /// Validates and resolves the manifest into a [`Graph`].
    pub fn build(self) -> Result<Graph, GraphError> {
        Graph::new(self.name, self.path, self.projects)
    }
}

/// A validated, acyclic project graph. Read-only once built.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    path: PathBuf,
    projects: BTreeMap<PathBuf, Project>,
    nodes: Arena<TargetId, GraphTarget>,
    index: HashMap<GraphTarget, TargetId>,
    edges: Vec<Vec<GraphDependency>>,
    target_edges: Vec<Vec<TargetId>>,
    levels: Vec<Vec<TargetId>>,
}

impl Graph {
    /// Builds a graph from loaded projects.
    ///
    /// Fails with [`GraphError::UnknownTarget`] for dependencies on targets no
    /// project declares and with [`GraphError::CycleDetected`] if the target
    /// edges are not acyclic.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        projects: Vec<Project>,
    ) -> Result<Self, GraphError> {
        let mut by_path = BTreeMap::new();
        for project in projects {
            let path = project.path.clone();
            if by_path.insert(path.clone(), project).is_some() {
                return Err(GraphError::DuplicateProject { path });
            }
        }

        let mut nodes: Arena<TargetId, GraphTarget> = Arena::new();
        let mut index = HashMap::new();
        for project in by_path.values() {
            for target in &project.targets {
                let key = GraphTarget::new(project.path.clone(), target.name.clone());
                let id = nodes.alloc(key.clone());
                if index.insert(key, id).is_some() {
                    return Err(GraphError::DuplicateTarget {
                        path: project.path.clone(),
                        name: target.name.clone(),
                    });
                }
            }
        }

        let mut edges = Vec::with_capacity(nodes.len());
        let mut target_edges = Vec::with_capacity(nodes.len());
        for (_, node) in nodes.iter() {
            let project = &by_path[&node.path];
            let mut resolved = Vec::new();
            let mut to_targets = Vec::new();
            if let Some(target) = project.target(&node.name) {
                for dependency in &target.dependencies {
                    let edge = resolve_dependency(project, target, dependency, &index)?;
                    if let GraphDependency::Target(dep) = &edge {
                        to_targets.push(index[dep]);
                    }
                    resolved.push(edge);
                }
            }
            to_targets.sort();
            to_targets.dedup();
            edges.push(resolved);
            target_edges.push(to_targets);
        }

        check_acyclic(&nodes, &target_edges)?;
        let levels = layer(&nodes, &target_edges);

        Ok(Self {
            name: name.into(),
            path: path.into(),
            projects: by_path,
            nodes,
            index,
            edges,
            target_edges,
            levels,
        })
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root path the graph was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Projects in path order.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Looks up a project by path.
    pub fn project(&self, path: &Path) -> Option<&Project> {
        self.projects.get(path)
    }

    /// Every target, ordered by project path then declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &GraphTarget> {
        self.nodes.iter().map(|(_, node)| node)
    }

    /// Number of targets in the graph.
    pub fn target_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph contains the target.
    pub fn contains(&self, target: &GraphTarget) -> bool {
        self.index.contains_key(target)
    }

    /// Returns the target definition for an identity.
    pub fn target(&self, target: &GraphTarget) -> Option<&Target> {
        self.projects.get(&target.path)?.target(&target.name)
    }

    /// Finds every target with the given name, across projects.
    pub fn targets_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GraphTarget> {
        self.targets().filter(move |t| t.name == name)
    }

    /// Direct dependency edges of a target, in declaration order.
    pub fn dependencies(&self, target: &GraphTarget) -> &[GraphDependency] {
        match self.index.get(target) {
            Some(id) => &self.edges[id.index()],
            None => &[],
        }
    }

    /// Direct target dependencies, deduplicated and in node order.
    pub fn direct_target_dependencies(&self, target: &GraphTarget) -> Vec<&GraphTarget> {
        match self.index.get(target) {
            Some(id) => self.target_edges[id.index()]
                .iter()
                .map(|dep| &self.nodes[*dep])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns `true` if any transitive dependency of `target` satisfies the predicate.
    ///
    /// The target itself is not tested.
    pub fn depends_on<F>(&self, target: &GraphTarget, predicate: F) -> bool
    where
        F: Fn(&GraphDependency) -> bool,
    {
        let Some(&start) = self.index.get(target) else {
            return false;
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            for edge in &self.edges[id.index()] {
                if predicate(edge) {
                    return true;
                }
            }
            stack.extend(self.target_edges[id.index()].iter().copied());
        }
        false
    }

    /// All targets reachable from `target` through target edges, excluding itself.
    pub fn transitive_target_dependencies(&self, target: &GraphTarget) -> BTreeSet<GraphTarget> {
        let mut found = BTreeSet::new();
        let Some(&start) = self.index.get(target) else {
            return found;
        };
        let mut stack: Vec<TargetId> = self.target_edges[start.index()].clone();
        while let Some(id) = stack.pop() {
            if found.insert(self.nodes[id].clone()) {
                stack.extend(self.target_edges[id.index()].iter().copied());
            }
        }
        found
    }

    /// Whether an edge points at something that only exists for tests: a
    /// testing SDK, a test bundle, or a target flagged `testing_only`.
    pub fn is_test_only(&self, dependency: &GraphDependency) -> bool {
        match dependency {
            GraphDependency::Sdk { name, .. } => TEST_SDKS.contains(&name.as_str()),
            GraphDependency::Target(target) => self
                .target(target)
                .is_some_and(|t| t.product.is_test_bundle() || t.metadata.testing_only),
            _ => false,
        }
    }

    /// Targets grouped into dependency levels.
    ///
    /// Level 0 holds targets without target dependencies; every target in
    /// level `n` depends only on targets in lower levels. Each level is
    /// sorted by [`GraphTarget`], so the layering is deterministic.
    pub fn levels(&self) -> Vec<Vec<&GraphTarget>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|id| &self.nodes[*id]).collect())
            .collect()
    }

    /// Targets with dependencies before dependents.
    pub fn topological_order(&self) -> Vec<&GraphTarget> {
        self.levels
            .iter()
            .flatten()
            .map(|id| &self.nodes[*id])
            .collect()
    }

    /// Converts the graph back into its serializable form.
    pub fn to_manifest(&self) -> GraphManifest {
        GraphManifest {
            name: self.name.clone(),
            path: self.path.clone(),
            projects: self.projects.values().cloned().collect(),
        }
    }
}

fn resolve_dependency(
    project: &Project,
    target: &Target,
    dependency: &TargetDependency,
    index: &HashMap<GraphTarget, TargetId>,
) -> Result<GraphDependency, GraphError> {
    let lookup = |path: PathBuf, name: &str| {
        let key = GraphTarget::new(path, name);
        if index.contains_key(&key) {
            Ok(GraphDependency::Target(key))
        } else {
            Err(GraphError::UnknownTarget {
                from: target.name.clone(),
                target: name.to_string(),
                path: key.path,
            })
        }
    };
    match dependency {
        TargetDependency::Target { name } => lookup(project.path.clone(), name),
        TargetDependency::Project { target, path } => lookup(project.resolve(path), target),
        TargetDependency::Framework { path } => Ok(GraphDependency::Framework {
            path: project.resolve(path),
        }),
        TargetDependency::Xcframework { path } => Ok(GraphDependency::Xcframework {
            path: project.resolve(path),
        }),
        TargetDependency::Library { path } => Ok(GraphDependency::Library {
            path: project.resolve(path),
        }),
        TargetDependency::Sdk { name, optional } => Ok(GraphDependency::Sdk {
            name: name.clone(),
            optional: *optional,
        }),
        TargetDependency::Package { product } => Ok(GraphDependency::Package {
            product: product.clone(),
        }),
    }
}

fn check_acyclic(
    nodes: &Arena<TargetId, GraphTarget>,
    target_edges: &[Vec<TargetId>],
) -> Result<(), GraphError> {
    let mut graph = DiGraph::<TargetId, ()>::with_capacity(nodes.len(), target_edges.len());
    let indices: Vec<_> = nodes.ids().map(|id| graph.add_node(id)).collect();
    for (from, deps) in target_edges.iter().enumerate() {
        for dep in deps {
            graph.add_edge(indices[from], indices[dep.index()], ());
        }
    }
    if !is_cyclic_directed(&graph) {
        return Ok(());
    }

    let component = tarjan_scc(&graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .unwrap_or_default();
    let mut cycle: Vec<String> = component
        .iter()
        .map(|ix| nodes[graph[*ix]].name.clone())
        .collect();
    cycle.sort();
    Err(GraphError::CycleDetected { cycle })
}

fn layer(
    nodes: &Arena<TargetId, GraphTarget>,
    target_edges: &[Vec<TargetId>],
) -> Vec<Vec<TargetId>> {
    let mut pending: Vec<usize> = target_edges.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<TargetId>> = vec![Vec::new(); nodes.len()];
    for (from, deps) in target_edges.iter().enumerate() {
        for dep in deps {
            dependents[dep.index()].push(TargetId::from_raw(from as u32));
        }
    }

    let by_identity = |a: &TargetId, b: &TargetId| nodes[*a].cmp(&nodes[*b]);
    let mut current: Vec<TargetId> = nodes.ids().filter(|id| pending[id.index()] == 0).collect();
    current.sort_by(by_identity);

    let mut levels = Vec::new();
    while !current.is_empty() {
        let mut next = Vec::new();
        for id in &current {
            for dependent in &dependents[id.index()] {
                pending[dependent.index()] -= 1;
                if pending[dependent.index()] == 0 {
                    next.push(*dependent);
                }
            }
        }
        next.sort_by(by_identity);
        levels.push(std::mem::replace(&mut current, next));
    }
    levels
}
