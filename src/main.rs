mod cli;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use friendcircle::config::FriendCircleConfig;

#[derive(Parser)]
#[command(name = "friendcircle", version, about = "Interest-circle backend: transcript tagging, tag rooms, archive export")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Check database health
    Doctor,
    /// Show user and tag statistics
    Stats,
    /// Show one user record by uid or wallet address
    Inspect {
        /// A uid, or a 0x-prefixed wallet address
        who: String,
    },
    /// Print a user's archived conversation CIDs as JSON
    Export {
        /// Wallet address of the user
        wallet: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FriendCircleConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Inspect { who } => cli::inspect::inspect(&config, &who)?,
        Command::Export { wallet } => cli::export::export(&config, &wallet)?,
    }

    Ok(())
}
