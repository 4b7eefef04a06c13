//! `nt` — command-line interface for a content-addressed note store.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nt")]
#[command(about = "Content-addressed object store and indexer for a Markdown note repository", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository in the current directory
    Init,
    /// Stage additions, modifications and deletions under a path spec
    Add {
        /// Path specs to restrict staging to (every tracked file if omitted)
        pathspec: Vec<String>,
    },
    /// Promote staged deltas into the index and sync the database mirror
    Commit,
    /// Discard staged deltas, reverting to the last committed state
    Reset {
        /// Path specs to restrict the reset to (every staged entry if omitted)
        pathspec: Vec<String>,
    },
    /// Show pending changes between the working tree, the staging area and the index
    Status,
    /// Delete pack files and blobs unreferenced by the index
    Gc {
        /// Report what would be deleted without touching disk
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare this repository's index against a peer's index manifest
    Diff {
        /// Path to the peer's `.nt/index` file
        remote: String,
    },
    /// Print a decoded object, or raw bytes for a blob
    #[command(name = "cat-file")]
    CatFile {
        /// 40-hex object id
        oid: String,
    },
    /// Run a full-text / structured search against the database mirror
    Search {
        /// Query string: bare terms, plus kind:/path:/@attr: tokens
        query: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Add { pathspec } => commands::add::run(&pathspec),
        Commands::Commit => commands::commit::run(),
        Commands::Reset { pathspec } => commands::reset::run(&pathspec),
        Commands::Status => commands::status::run(),
        Commands::Gc { dry_run } => commands::gc::run(dry_run),
        Commands::Diff { remote } => commands::diff::run(&remote),
        Commands::CatFile { oid } => commands::cat_file::run(&oid),
        Commands::Search { query } => commands::search::run(&query),
    }
}
