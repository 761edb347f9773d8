//! # docwindow CLI (`dw`)
//!
//! Index a directory of text documents into SQLite and search it with
//! hybrid lexical + semantic scoring and context-window expansion.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dw init` | Create the SQLite database and schema |
//! | `dw index` | Rebuild the index from `[index].root` |
//! | `dw search "<query>"` | Hybrid search, optionally with context windows |
//! | `dw get <id>` | Print a document and its chunks |
//! | `dw stats` | Document, chunk, and embedding counts |
//! | `dw serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! dw --config ./config/docwindow.toml init
//! dw index --dry-run
//! dw search "ORDERS refunds" --category table-context --window 1
//! dw search "experiment CTR lift" --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docwindow::config::{self, DEFAULT_CONFIG_PATH};
use docwindow::search::SearchArgs;
use docwindow::{get, ingest, migrate, search, server, stats};

/// docwindow: hybrid document search with context windows.
///
/// All commands read a TOML configuration file; see
/// `config/docwindow.example.toml` for every option.
#[derive(Parser)]
#[command(
    name = "dw",
    about = "docwindow: hybrid lexical + semantic document search with context windows",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Safe to run more than once.
    Init,

    /// Rebuild the index from the configured document root.
    ///
    /// Every run drops and recreates both tables. Not safe to run two
    /// indexers against the same database at once.
    Index {
        /// Report files and estimated chunks without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search indexed documents.
    Search {
        /// Search query. Keywords are words of three or more letters.
        query: String,

        /// Restrict to one category.
        #[arg(long)]
        category: Option<String>,

        /// Restrict to one subcategory.
        #[arg(long)]
        subcategory: Option<String>,

        /// Number of results.
        #[arg(long)]
        top_k: Option<usize>,

        /// Weight of the lexical score.
        #[arg(long)]
        bm25_weight: Option<f64>,

        /// Weight of the semantic score.
        #[arg(long)]
        embedding_weight: Option<f64>,

        /// Always expand hits to context windows.
        #[arg(long)]
        context: bool,

        /// Context half-width in chunks.
        #[arg(long)]
        window: Option<usize>,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a document by ID.
    Get {
        /// Document ID (hex SHA-256 of the relative path).
        id: String,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCWINDOW_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Index { dry_run } => {
            ingest::run_index(&cfg, dry_run).await?;
        }
        Commands::Search {
            query,
            category,
            subcategory,
            top_k,
            bm25_weight,
            embedding_weight,
            context,
            window,
            json,
        } => {
            let args = SearchArgs {
                category,
                subcategory,
                top_k,
                bm25_weight,
                embedding_weight,
                context,
                window,
                json,
            };
            search::run_search(&cfg, &query, &args).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
