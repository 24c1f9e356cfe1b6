use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use clap::{Parser, Subcommand};
use tictactoe_deploy::CONFIG_FILENAME;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "tictactoe")]
#[command(author, version, about = "Deploy and verify the TicTacToe contract")]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "TICTACTOE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file.
    ///
    /// Defaults to `Tictactoe.toml` in the current directory when it exists.
    #[arg(short, long, env = "TICTACTOE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the deploy scripts against a network.
    Deploy(DeployArgs),

    /// Verify an already deployed contract on the network's block explorer.
    Verify(VerifyArgs),

    /// Print the runtime size of every compiled contract.
    Size,

    /// List the configured networks. Secrets are never printed.
    Networks,
}

#[derive(clap::Args)]
pub struct DeployArgs {
    /// The network to deploy to. Defaults to `default_network` from the configuration.
    #[arg(short, long, env = "TICTACTOE_NETWORK")]
    pub network: Option<String>,

    /// Only run the scripts carrying one of these tags.
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Send new deployment transactions even when a recorded deployment matches.
    #[arg(long, default_value_t = false)]
    pub redeploy: bool,

    /// Exit with an error when a verification fails.
    #[arg(long, default_value_t = false)]
    pub strict_verify: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    #[arg(short, long, env = "TICTACTOE_NETWORK")]
    pub network: String,

    /// The contract (artifact) name.
    #[arg(long, default_value = "TicTacToe")]
    pub contract: String,

    /// The contract address. Defaults to the recorded deployment on the network.
    #[arg(long)]
    pub address: Option<Address>,
}

/// The configuration file to load: the explicit one, or `Tictactoe.toml` in `dir` if present.
pub fn resolve_config_path(explicit: Option<PathBuf>, dir: &Path) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default = dir.join(CONFIG_FILENAME);
        default.exists().then_some(default)
    })
}
