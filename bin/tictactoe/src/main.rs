//! tictactoe deploys the TicTacToe contract and publishes its source on block explorers.

mod cli;
mod commands;

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use tictactoe_deploy::{ConfigProvider, DeployConfig, EnvSecrets};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets usually live in a `.env` file next to the configuration.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_path = cli::resolve_config_path(cli.config, Path::new("."));
    let config = DeployConfig::load(config_path.as_deref())?;
    let provider = ConfigProvider::new(&config, &EnvSecrets);

    match cli.command {
        Command::Deploy(args) => commands::deploy(&provider, args).await,
        Command::Verify(args) => commands::verify(&provider, args).await,
        Command::Size => commands::size(&provider),
        Command::Networks => commands::networks(&provider),
    }
}
