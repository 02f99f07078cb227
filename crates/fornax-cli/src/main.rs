mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("Fornax CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let ctx = commands::CommandContext {
        config: cli.config.as_deref(),
        set_values: &cli.set_values,
        quiet: cli.quiet,
    };
    let result = match cli.command {
        Commands::Play(args) => {
            info!("Dispatching to 'play' command.");
            commands::play::run(args, &ctx).await
        }
        Commands::Strip(args) => {
            info!("Dispatching to 'strip' command.");
            commands::strip::run(args, &ctx).await
        }
        Commands::Scene(args) => {
            info!("Dispatching to 'scene' command.");
            commands::scene::run(args, &ctx).await
        }
    };

    match &result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    result
}
