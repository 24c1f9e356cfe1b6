//! Deployment configuration.
//!
//! The configuration is layered with figment: built-in defaults, then an optional
//! `Tictactoe.toml`, then `TICTACTOE_`-prefixed environment variables (`__` separates
//! nested keys, e.g. `TICTACTOE_NETWORKS__GOERLI__BLOCK_CONFIRMATIONS=3`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{NamedAccounts, SecretRef};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Tictactoe.toml";

/// Prefix of the environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "TICTACTOE_";

/// Mnemonic of the well-known local development accounts (hardhat node, anvil, ganache -d).
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

/// Default test and confirmation timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Settings of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    /// Confirmations to wait for after a deployment. Unset or zero means 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_confirmations: Option<u64>,
    /// JSON-RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<SecretRef>,
    /// Private keys, in account index order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<SecretRef>,
    /// HD wallet mnemonic, used when `accounts` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<SecretRef>,
}

impl NetworkConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block_confirmations: None,
            url: None,
            accounts: Vec::new(),
            mnemonic: None,
        }
    }

    pub fn block_confirmations(mut self, confirmations: u64) -> Self {
        self.block_confirmations = Some(confirmations);
        self
    }

    pub fn url(mut self, url: SecretRef) -> Self {
        self.url = Some(url);
        self
    }

    pub fn account(mut self, key: SecretRef) -> Self {
        self.accounts.push(key);
        self
    }

    pub fn mnemonic(mut self, mnemonic: SecretRef) -> Self {
        self.mnemonic = Some(mnemonic);
        self
    }
}

/// Gas usage reporting after deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasReporterConfig {
    pub enabled: bool,
    /// Write the report to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub no_colors: bool,
    /// Fiat currency used for cost estimates.
    pub currency: String,
    /// CoinMarketCap API key used to price `token` in `currency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinmarketcap: Option<SecretRef>,
    /// Native token symbol of the network.
    pub token: String,
}

impl Default for GasReporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_file: Some(PathBuf::from("gas-report.txt")),
            no_colors: true,
            currency: "USD".to_string(),
            coinmarketcap: Some(SecretRef::env("COINMARKETCAP_API_KEY")),
            token: "ETH".to_string(),
        }
    }
}

/// Compiler settings and artifact location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityConfig {
    /// Compiler version the artifacts were built with.
    pub version: String,
    /// Directory holding the compiled artifacts.
    pub artifacts: PathBuf,
}

impl Default for SolidityConfig {
    fn default() -> Self {
        Self {
            version: "0.8.17".to_string(),
            artifacts: PathBuf::from("artifacts"),
        }
    }
}

/// Block explorer settings, keyed by network name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtherscanConfig {
    #[serde(default)]
    pub api_key: BTreeMap<String, SecretRef>,
    /// API endpoints for networks without a built-in one.
    #[serde(default)]
    pub api_url: BTreeMap<String, String>,
}

/// Limits of the deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Upper bound for confirmation and verification polling, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// The full deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub default_network: String,
    /// Ephemeral or local networks: nothing deployed there is verified.
    pub development_networks: Vec<String>,
    /// Where deployment records are persisted, one sub-directory per network.
    pub deployments_dir: PathBuf,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub gas_reporter: GasReporterConfig,
    pub solidity: SolidityConfig,
    pub named_accounts: NamedAccounts,
    pub etherscan: EtherscanConfig,
    pub runner: RunnerConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let networks = BTreeMap::from([
            (
                "hardhat".to_string(),
                NetworkConfig::new(31337)
                    .block_confirmations(1)
                    .url(SecretRef::literal("http://127.0.0.1:8545"))
                    .mnemonic(SecretRef::literal(DEV_MNEMONIC)),
            ),
            (
                "localhost".to_string(),
                NetworkConfig::new(31337)
                    .block_confirmations(1)
                    .url(SecretRef::literal("http://127.0.0.1:8545"))
                    .mnemonic(SecretRef::literal(DEV_MNEMONIC)),
            ),
            (
                "ganache".to_string(),
                NetworkConfig::new(1337)
                    .block_confirmations(1)
                    .url(SecretRef::literal("http://127.0.0.1:7545"))
                    .account(SecretRef::literal("")),
            ),
            (
                "goerli".to_string(),
                NetworkConfig::new(5)
                    .block_confirmations(6)
                    .url(SecretRef::env("GOERLI_URL"))
                    .account(SecretRef::env("PRIVATE_KEY")),
            ),
            (
                "arbitrum".to_string(),
                NetworkConfig::new(42161)
                    .block_confirmations(6)
                    .url(SecretRef::env("ARBITRUM_URL"))
                    .account(SecretRef::env("PRIVATE_KEY")),
            ),
        ]);

        Self {
            default_network: "hardhat".to_string(),
            development_networks: vec![
                "hardhat".to_string(),
                "localhost".to_string(),
                "ganache".to_string(),
            ],
            networks,
            gas_reporter: GasReporterConfig::default(),
            solidity: SolidityConfig::default(),
            named_accounts: NamedAccounts::default(),
            etherscan: EtherscanConfig {
                api_key: BTreeMap::from([(
                    "goerli".to_string(),
                    SecretRef::env("ETHERSCAN_API_KEY"),
                )]),
                api_url: BTreeMap::new(),
            },
            runner: RunnerConfig::default(),
            deployments_dir: PathBuf::from("deployments"),
        }
    }
}

impl DeployConfig {
    /// The layered figment: defaults, then `path` (if any), then the environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration.
    ///
    /// An explicitly given file must exist; without one, the defaults and the
    /// environment are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
        }

        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")?;

        tracing::debug!(
            path = ?path.map(|p| p.display().to_string()),
            networks = config.networks.len(),
            default_network = %config.default_network,
            "Configuration loaded"
        );

        Ok(config)
    }
}
