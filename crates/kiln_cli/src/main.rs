//! kiln CLI: content hashing and binary caching for generated projects.
//!
//! Provides `kiln hash` for printing the cache key of every cacheable target
//! and `kiln cache status` for checking which of them are already cached.

#![warn(missing_docs)]

mod cache;
mod error;
mod hash;
mod logging;
mod pipeline;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kiln_common::{CacheOutputType, ErrorKind, FatalError};

use crate::error::CliError;

/// kiln: content-addressed binary caching for project graphs.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "kiln build cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `kiln.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the cache key of every cacheable target.
    Hash(HashArgs),
    /// Inspect the binary cache.
    Cache {
        /// The cache subcommand to run.
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// `kiln cache` subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Report which cacheable targets are present in the cache.
    Status(StatusArgs),
}

/// Graph and variant selection shared by every command.
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// JSON file holding the resolved project graph.
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Cache profile from `kiln.toml`.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Kind of artifact the keys are computed for.
    #[arg(long, default_value_t = CacheOutputType::Xcframework)]
    pub output_type: CacheOutputType,
}

/// Arguments for the `kiln hash` subcommand.
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Graph selection.
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Shorthand for `--format json`.
    #[arg(long, conflicts_with = "format")]
    pub json: bool,
}

impl HashArgs {
    /// The effective report format.
    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            self.format
        }
    }
}

/// Arguments for the `kiln cache status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Graph selection.
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Hash(ref args) => hash::run(args, &global),
        Command::Cache {
            command: CacheCommand::Status(ref args),
        } => cache::status(args, &global).await,
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            report(&e);
            process::exit(e.kind().exit_code());
        }
    }
}

fn report(error: &CliError) {
    match error.kind() {
        ErrorKind::Abort => eprintln!("error: {error}"),
        ErrorKind::SilentAbort => {}
        ErrorKind::Bug => {
            eprintln!("error: {error}");
            eprintln!("This is a bug in kiln. Please report it along with the command you ran.");
        }
    }
}
