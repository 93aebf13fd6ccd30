pub mod artifact;
pub mod indexer;
pub mod model;
pub mod search;
pub mod ui;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};

use indexer::IndexOptions;
use search::{FsShardFetcher, SearchRuntime};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "mars",
    version,
    about = "Message archive search: build shard artifacts and query them"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the search artifact from a site dataset
    Build {
        /// Directory containing search.json
        #[arg(long)]
        input: PathBuf,

        /// Site output root; the artifact lands under <out>/search/.
        /// Defaults to the input directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Emit a machine-readable JSON summary on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load an artifact and print suggestions for a query
    Query {
        /// Query text
        text: String,

        /// Artifact directory (the search/ directory itself)
        #[arg(long)]
        artifact: PathBuf,

        /// Maximum number of suggestions
        #[arg(long, default_value_t = ui::DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,

        /// Emit machine-readable JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

impl Cli {
    /// Whether stdout is reserved for machine-readable output. Logging drops
    /// to warnings so robots get clean JSON.
    pub fn robot_output(&self) -> bool {
        matches!(
            self.command,
            Commands::Build { json: true, .. } | Commands::Query { json: true, .. }
        )
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// level; logs go to stderr so stdout stays parseable.
pub fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.robot_output());

    match cli.command {
        Commands::Build { input, out, json } => run_build(input, out, json),
        Commands::Query { text, artifact, limit, json } => {
            run_query(&text, artifact, limit, json).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mars", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

fn run_build(input: PathBuf, out: Option<PathBuf>, json: bool) -> Result<()> {
    let output_dir = out.unwrap_or_else(|| input.clone());
    let summary = indexer::build_index(&IndexOptions { input_dir: input, output_dir })?;
    match summary {
        Some(summary) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "indexed {} records ({} distinct tokens) into {} shards at {} [version {}]",
                    summary.records,
                    summary.distinct_tokens,
                    summary.shards,
                    summary.artifact_dir.display(),
                    summary.version,
                );
            }
        }
        None => {
            // No dataset is a valid "no search on this site" deployment.
            if json {
                println!("{}", serde_json::json!({ "built": false }));
            }
        }
    }
    Ok(())
}

async fn run_query(text: &str, artifact: PathBuf, limit: usize, json: bool) -> Result<()> {
    let runtime = SearchRuntime::new(FsShardFetcher::new(artifact));
    runtime
        .ensure_loaded()
        .await
        .map_err(|err| anyhow!("load artifact: {err}"))?;
    let suggestions = runtime.search(text, limit);
    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else {
        for s in &suggestions {
            println!("{}\t{}\t{}\t{}", s.href, s.user, s.timestamp, s.title);
        }
    }
    Ok(())
}
