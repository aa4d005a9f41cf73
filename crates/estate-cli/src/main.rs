//! # estate CLI entry point
//!
//! Parses command-line arguments, connects to the database and dispatches
//! to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use estate_cli::admin::{run_admin, AdminArgs};
use estate_cli::counts::{run_counts, CountsArgs};

/// Estate listing service operator CLI.
#[derive(Parser, Debug)]
#[command(name = "estate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Account bootstrap.
    Admin(AdminArgs),

    /// Listing counter audit and repair.
    Counts(CountsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let Some(url) = cli.database_url.as_deref() else {
        anyhow::bail!("DATABASE_URL (or --database-url) is required");
    };
    let store = estate_cli::connect(url).await?;

    match cli.command {
        Commands::Admin(args) => run_admin(args, store).await,
        Commands::Counts(args) => run_counts(&args, store).await,
    }
}
