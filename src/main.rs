//! Newsdesk command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use newsdesk::commands::{self, overview::OverviewCommand, stock::StockCommand};
use newsdesk::config::AppConfig;
use newsdesk::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "newsdesk")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database target: `:memory:`, a file path or `md:<database>`
    #[arg(long, global = true, env = "NEWSDESK_DATABASE")]
    database: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Market-wide retrievals
    Overview(OverviewCommand),
    /// Per-symbol retrievals
    Stock(StockCommand),
    /// List the databases visible to the connection
    Ping,
    /// Create the base tables in a local database
    InitSchema,
}

fn main() -> Result<()> {
    newsdesk::init_tracing();

    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.database.as_deref()).context("Failed to load configuration")?;
    if matches!(cli.command, Commands::InitSchema) {
        config.read_only = false;
    }

    let state = AppState::new(&config)
        .with_context(|| format!("Failed to open database {}", config.database))?;

    let outcome = match cli.command {
        Commands::Overview(cmd) => commands::overview::execute(cmd, &state),
        Commands::Stock(cmd) => commands::stock::execute(cmd, &state),
        Commands::Ping => state
            .duckdb
            .list_databases()
            .and_then(|names| commands::print_json(&names)),
        Commands::InitSchema => state.duckdb.bootstrap_schema().map(|()| {
            tracing::info!("Schema ready on {}", config.database);
        }),
    };

    state.shutdown().context("Failed to close database")?;
    outcome.context("Command failed")?;

    Ok(())
}
