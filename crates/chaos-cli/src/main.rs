use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "chaos-run")]
#[command(about = "Randomly destroy fleet members to prove the system survives it", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/chaos-run/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run on the configured schedule
    Serve,

    /// Run one destruction pass now and print the report
    Run {
        /// Select and report without destroying anything
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List current members and their kill probability
    Members {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show, locate or initialise the config file
    Config {
        /// Print the config path only
        #[arg(long)]
        path: bool,

        /// Write a sample config
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    use Commands::*;

    match cli.command {
        Serve => {
            let config = dispatch::load_config(config_path)?;
            commands::serve::run(&config).await?;
        }
        Run { dry_run, json } => {
            let config = dispatch::load_config(config_path)?;
            commands::run::run(&config, dry_run, json).await?;
        }
        Members { json } => {
            let config = dispatch::load_config(config_path)?;
            commands::members::run(&config, json).await?;
        }
        Config { path, init } => {
            commands::config::run(config_path, path, init).await?;
        }
    }

    Ok(())
}
