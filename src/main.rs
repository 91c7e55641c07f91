//! # SDG matcher CLI (`sdg`)
//!
//! Matches free-text descriptions against the UN Sustainable Development
//! Goals taxonomy by embedding similarity.
//!
//! ## Usage
//!
//! ```bash
//! sdg --config ./config/sdg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sdg match "<query>"` | Rank taxonomy statements against a query |
//! | `sdg statements` | Print the flattened reference corpus |
//! | `sdg check` | Validate config and taxonomy |
//! | `sdg serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Top 3 matches above 0.5 (the defaults)
//! sdg match "child stunting in rural districts"
//!
//! # Everything above 0.3, as CSV
//! sdg match "maternal health clinics" --top-n 10 --threshold 0.3 --format csv
//!
//! # Use a different taxonomy file
//! sdg --taxonomy ./data/sdg_full.json match "clean water access"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use sdg_context::commands::{self, MatchOptions};
use sdg_context::config;
use sdg_context::export::ExportFormat;
use sdg_context::server;

const DEFAULT_CONFIG: &str = "./config/sdg.toml";

/// SDG matcher: map free text onto Sustainable Development Goals,
/// targets, and indicators.
#[derive(Parser)]
#[command(
    name = "sdg",
    about = "Match free text against the UN Sustainable Development Goals taxonomy",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/sdg.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Taxonomy file (`.json` or `.toml`). Overrides `[taxonomy].path`.
    #[arg(long, global = true)]
    taxonomy: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank taxonomy statements by similarity to a query.
    ///
    /// Embeds every goal, target, and indicator, then returns the best
    /// `--top-n` statements scoring at least `--threshold`.
    Match {
        /// Free-text description to match.
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        top_n: Option<usize>,

        /// Minimum cosine similarity for a result to be kept.
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f32>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: ExportFormat,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the flattened reference statements.
    Statements {
        /// Output format (`text` or `json`).
        #[arg(long, value_enum, default_value = "text")]
        format: ExportFormat,
    },

    /// Validate the configuration and taxonomy.
    Check,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("sdg_context=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sdg_context=info"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut cfg = config::load_config_or_default(&config_path, explicit)?;
    if let Some(path) = cli.taxonomy {
        cfg.taxonomy.path = Some(path);
    }

    match cli.command {
        Commands::Match {
            query,
            top_n,
            threshold,
            format,
            output,
        } => {
            let opts = MatchOptions {
                top_n,
                threshold,
                format,
            };
            commands::run_match(&cfg, &query, &opts, output.as_deref()).await?;
        }
        Commands::Statements { format } => {
            commands::run_statements(&cfg, format)?;
        }
        Commands::Check => {
            commands::run_check(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
