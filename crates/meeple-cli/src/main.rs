// crates/meeple-cli/src/main.rs
//
// CLI entrypoint for the Meeple recommender.
//
// Talks to a running meeple-daemon over its JSON-RPC endpoint: request
// recommendations, inspect the loaded model, and check node health.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::recommend::RecommendCmd;
use output::OutputFormat;

/// Meeple CLI: hybrid board-game recommendations from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "meeple",
    version,
    about = "Meeple CLI for the hybrid board-game recommender"
)]
struct Cli {
    /// RPC endpoint for the meeple-daemon.
    #[arg(long, global = true, default_value = "http://localhost:50061")]
    rpc: String,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask for recommendations given a set of ratings.
    Recommend(RecommendCmd),

    /// Display the loaded model and blend configuration.
    Model,

    /// Display daemon health.
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    match &cli.command {
        Commands::Recommend(cmd) => commands::recommend::run(&cli.rpc, cmd, &format).await?,
        Commands::Model => commands::model::run(&cli.rpc, &format).await?,
        Commands::Health => commands::health::run(&cli.rpc, &format).await?,
    }

    Ok(())
}
