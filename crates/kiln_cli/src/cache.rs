//! `kiln cache status`: which cacheable targets are already cached.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_cache::{
    artifact_name, AuthenticationProvider, CacheStorageProvider, ChainedTokenProvider,
    EnvTokenProvider,
};

use crate::error::CliError;
use crate::hash::label;
use crate::pipeline::prepare;
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `kiln cache status` command.
///
/// Returns exit code 0 when every cacheable target is cached and 1 otherwise.
pub async fn status(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, CliError> {
    let prepared = prepare(&args.graph, global)?;
    let provider =
        CacheStorageProvider::new(prepared.config, prepared.project_root, authentication());
    let chain = provider.chain().await?;

    let mut rows = Vec::new();
    for (target, hash) in &prepared.hashes {
        let name = artifact_name(target, args.graph.output_type);
        let cached = chain.exists(*hash, &name).await?;
        rows.push((label(target, &prepared.hashes), *hash, cached));
    }
    rows.sort();
    let missing = rows.iter().filter(|(_, _, cached)| !cached).count();

    match args.format {
        ReportFormat::Text => {
            for (name, hash, cached) in &rows {
                let state = if *cached { "cached" } else { "missing" };
                println!("{name} - {hash} - {state}");
            }
            if !global.quiet {
                eprintln!(
                    "   Result: {} of {} target(s) cached (profile '{}', {} storage(s))",
                    rows.len() - missing,
                    rows.len(),
                    prepared.profile.name,
                    chain.storages().len()
                );
            }
        }
        ReportFormat::Json => {
            let entries: Vec<serde_json::Value> = rows
                .iter()
                .map(|(name, hash, cached)| {
                    serde_json::json!({
                        "target": name,
                        "hash": hash.to_string(),
                        "cached": cached,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries).map_err(CliError::Render)?);
        }
    }

    Ok(if missing == 0 { 0 } else { 1 })
}

/// `KILN_TOKEN`, then credentials stored under `~/.config/kiln/credentials`.
fn authentication() -> Arc<dyn AuthenticationProvider> {
    match std::env::var_os("HOME") {
        Some(home) => Arc::new(ChainedTokenProvider::standard(
            PathBuf::from(home).join(".config/kiln/credentials"),
        )),
        None => Arc::new(EnvTokenProvider::default()),
    }
}
