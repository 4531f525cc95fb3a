mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use memory_relay::config::RelayConfig;
use memory_relay::server;

#[derive(Parser)]
#[command(name = "memory-relay", version, about = "Memory-injecting chat relay for LLM APIs")]
struct Cli {
    /// Config file (default: ~/.memory-relay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP relay
    Serve,
    /// Seed triggers, facts, reflections and episodes from a JSON file
    Import {
        file: PathBuf,
        /// Target profile (overrides the file's "profile" field)
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print recent exchanges for a model's profile
    History {
        #[arg(long)]
        model: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a model's profile history (asks for confirmation)
    Reset {
        #[arg(long)]
        model: String,
    },
    /// Check database health and routing configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RelayConfig::load_from(path)?,
        None => RelayConfig::load()?,
    };

    // Logs go to stderr so CLI output on stdout stays clean.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Import { file, profile } => cli::import::import(&config, &file, profile.as_deref())?,
        Command::History { model, limit } => cli::history::history(&config, &model, limit)?,
        Command::Reset { model } => cli::reset::reset(&config, &model)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
