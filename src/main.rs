//! # fred-sync CLI (`fredsync`)
//!
//! ## Usage
//!
//! ```bash
//! fredsync --config ./config/fredsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fredsync init` | Create the SQLite database and run schema migrations |
//! | `fredsync sync` | Run one sync pass over the catalog |
//! | `fredsync schedule` | Run the sync pass on an interval |
//! | `fredsync serve` | Start the HTTP API |
//! | `fredsync status` | Show catalog, checkpoint, and per-series counts |
//! | `fredsync series <action>` | Add, remove, list, or search tracked series |
//! | `fredsync observations <id>` | Print stored rows for a series |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fred_sync::progress::ProgressMode;
use fred_sync::series::DEFAULT_SEARCH_LIMIT;
use fred_sync::{config, logging, migrate, scheduler, series, server, stats, sync};

/// fred-sync CLI: keeps a local SQLite copy of FRED series up to date.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/fredsync.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "fredsync",
    about = "A resumable, rate-limited synchronizer for FRED economic time series",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fredsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the catalog, data, and checkpoint
    /// tables, and seeds the checkpoint row at offset 0. Idempotent.
    Init,

    /// Run one sync pass, resuming from the stored checkpoint.
    Sync {
        /// Override `[sync].inter_item_delay_ms` for this run.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` on a terminal, otherwise `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Run the sync pass every `[schedule].interval_secs` until Ctrl-C.
    Schedule {
        /// Run a single pass and exit.
        #[arg(long)]
        once: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Show database status.
    Status,

    /// Manage the series catalog.
    Series {
        #[command(subcommand)]
        action: SeriesAction,
    },

    /// Print stored observations for a series.
    Observations {
        /// FRED series identifier, e.g. `UNRATE`.
        id: String,

        /// Print rows and segments as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SeriesAction {
    /// Track a series (updates the description if already tracked).
    Add {
        id: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Stop tracking a series. Stored observations are kept.
    Remove { id: String },
    /// List tracked series.
    List,
    /// Search tracked series by identifier substring.
    Search {
        term: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.format);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            delay_ms,
            json,
            progress,
        } => {
            let mode = ProgressMode::from_flag(progress.as_deref())?;
            sync::run_sync(&cfg, delay_ms, json, mode).await?;
        }
        Commands::Schedule { once } => {
            scheduler::run_schedule(&cfg, once).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
        Commands::Series { action } => match action {
            SeriesAction::Add { id, description } => {
                series::run_series_add(&cfg, &id, description.as_deref()).await?;
            }
            SeriesAction::Remove { id } => {
                series::run_series_remove(&cfg, &id).await?;
            }
            SeriesAction::List => {
                series::run_series_list(&cfg, None, usize::MAX).await?;
            }
            SeriesAction::Search { term, limit } => {
                series::run_series_list(&cfg, Some(&term), limit).await?;
            }
        },
        Commands::Observations { id, json } => {
            series::run_observations(&cfg, &id, json).await?;
        }
    }

    Ok(())
}
