//! Shared pipeline helpers for CLI commands.
//!
//! Every command loads the graph file, runs the graph mappers over it,
//! resolves the configuration and cache profile, and hashes the cacheable
//! targets. [`prepare`] does all of that.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_common::{CacheProfile, ContentHash};
use kiln_config::{CacheConfig, KilnConfig, ProjectSection, CONFIG_FILE_NAME};
use kiln_graph::{Graph, GraphManifest, GraphTarget};
use kiln_hasher::{ContentHasher, GraphContentHasher};
use kiln_mapper::{GraphMapper, PruneTargetsGraphMapper, SequentialGraphMapper};

use crate::error::CliError;
use crate::{GlobalArgs, GraphArgs};

/// Everything a command needs after the shared pipeline ran.
pub struct Prepared {
    /// The mapped graph.
    pub graph: Graph,
    /// Directory holding `kiln.toml`, or the graph root without one.
    pub project_root: PathBuf,
    /// The loaded configuration.
    pub config: KilnConfig,
    /// The resolved cache profile.
    pub profile: CacheProfile,
    /// Cache keys of the cacheable targets.
    pub hashes: BTreeMap<GraphTarget, ContentHash>,
}

/// Loads, maps and hashes the graph selected by `args`.
pub fn prepare(args: &GraphArgs, global: &GlobalArgs) -> Result<Prepared, CliError> {
    let graph = map_graph(load_graph(&args.graph)?)?;
    let (project_root, config) = load_config(global, &graph)?;
    let profile = kiln_config::resolve_profile(&config, args.profile.as_deref())?;
    let hashes = GraphContentHasher::new(Arc::new(ContentHasher::default()))
        .with_additional_strings(vec![concat!("kiln ", env!("CARGO_PKG_VERSION")).to_string()])
        .content_hashes(&graph, &profile, args.output_type)?;
    Ok(Prepared {
        graph,
        project_root,
        config,
        profile,
        hashes,
    })
}

/// Reads a graph manifest from a JSON file and validates it.
pub fn load_graph(path: &Path) -> Result<Graph, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadGraph {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: GraphManifest =
        serde_json::from_str(&text).map_err(|source| CliError::ParseGraph {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(manifest.build()?)
}

/// Runs the graph mappers. Their side effects only matter when generating
/// projects, so they are dropped.
pub fn map_graph(graph: Graph) -> Result<Graph, CliError> {
    let pipeline = SequentialGraphMapper::new(vec![Box::new(PruneTargetsGraphMapper)]);
    let (graph, side_effects) = pipeline.map(graph)?;
    tracing::debug!(side_effects = side_effects.len(), "mapped graph");
    Ok(graph)
}

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

/// Loads the configuration named by `--config`, or the nearest `kiln.toml`.
///
/// Without any configuration file the project is named after the graph, is
/// rooted at the graph path and uses the default cache settings.
pub fn load_config(global: &GlobalArgs, graph: &Graph) -> Result<(PathBuf, KilnConfig), CliError> {
    let root = match &global.config {
        Some(path) if path.is_file() => Some(
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        ),
        Some(path) => Some(path.clone()),
        None => find_project_root(&std::env::current_dir().map_err(CliError::CurrentDir)?),
    };

    match root {
        Some(root) => {
            let config = kiln_config::load_config(&root)?;
            Ok((root, config))
        }
        None => {
            tracing::debug!("no {CONFIG_FILE_NAME} found; using defaults");
            let config = KilnConfig {
                project: ProjectSection {
                    name: graph.name().to_string(),
                    full_handle: None,
                },
                cache: CacheConfig::default(),
            };
            Ok((graph.path().to_path_buf(), config))
        }
    }
}
