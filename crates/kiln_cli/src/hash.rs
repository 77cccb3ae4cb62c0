//! `kiln hash`: print the cache key of every cacheable target.

use std::collections::BTreeMap;

use kiln_common::ContentHash;
use kiln_graph::GraphTarget;

use crate::error::CliError;
use crate::pipeline::prepare;
use crate::{GlobalArgs, HashArgs, ReportFormat};

/// Runs the `kiln hash` command.
pub fn run(args: &HashArgs, global: &GlobalArgs) -> Result<i32, CliError> {
    let prepared = prepare(&args.graph, global)?;

    if prepared.hashes.is_empty() && !global.quiet {
        eprintln!("warning: the graph has no cacheable targets");
    }
    println!("{}", render(&prepared.hashes, args.report_format())?);
    Ok(0)
}

/// Renders `<target> - <hash>` lines sorted by target name, or a JSON object
/// keyed by target name.
fn render(
    hashes: &BTreeMap<GraphTarget, ContentHash>,
    format: ReportFormat,
) -> Result<String, CliError> {
    let mut rows: Vec<(String, String)> = hashes
        .iter()
        .map(|(target, hash)| (label(target, hashes), hash.to_string()))
        .collect();
    rows.sort();

    match format {
        ReportFormat::Text => Ok(rows
            .iter()
            .map(|(name, hash)| format!("{name} - {hash}"))
            .collect::<Vec<_>>()
            .join("\n")),
        ReportFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = rows
                .into_iter()
                .map(|(name, hash)| (name, serde_json::Value::String(hash)))
                .collect();
            serde_json::to_string_pretty(&object).map_err(CliError::Render)
        }
    }
}

/// The target name, qualified by its project path when the name is ambiguous.
pub(crate) fn label(target: &GraphTarget, hashes: &BTreeMap<GraphTarget, ContentHash>) -> String {
    if hashes.keys().filter(|t| t.name == target.name).count() > 1 {
        target.to_string()
    } else {
        target.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes() -> BTreeMap<GraphTarget, ContentHash> {
        BTreeMap::from([
            (GraphTarget::new("/work/B", "Zeta"), ContentHash::from_bytes(b"z")),
            (GraphTarget::new("/work/A", "Alpha"), ContentHash::from_bytes(b"a")),
        ])
    }

    #[test]
    fn text_lines_sorted_by_name() {
        let output = render(&hashes(), ReportFormat::Text).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("Alpha - {}", ContentHash::from_bytes(b"a")));
        assert!(lines[1].starts_with("Zeta - "));
    }

    #[test]
    fn json_object_keyed_by_name() {
        let output = render(&hashes(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["Alpha"], ContentHash::from_bytes(b"a").to_string());
    }

    #[test]
    fn ambiguous_names_are_qualified() {
        let mut map = hashes();
        map.insert(GraphTarget::new("/work/C", "Alpha"), ContentHash::from_bytes(b"c"));
        let output = render(&map, ReportFormat::Text).unwrap();
        assert!(output.contains("Alpha (/work/A) - "));
        assert!(output.contains("Alpha (/work/C) - "));
    }
}
