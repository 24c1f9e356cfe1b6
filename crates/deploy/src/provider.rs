//! The config provider: resolved, read-only settings handed to the deploy step.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    DeployConfig, DeployError, GasReporterConfig, NamedAccounts, NetworkProfile, Secret,
    SecretProvider,
};

/// Resolved gas reporter settings.
#[derive(Debug, Clone)]
pub struct GasReporterSettings {
    pub enabled: bool,
    pub output_file: Option<PathBuf>,
    pub no_colors: bool,
    pub currency: String,
    pub coinmarketcap: Option<Secret>,
    pub token: String,
}

impl GasReporterSettings {
    fn resolve(config: &GasReporterConfig, secrets: &impl SecretProvider) -> Self {
        Self {
            enabled: config.enabled,
            output_file: config
                .output_file
                .clone()
                .filter(|path| !path.as_os_str().is_empty()),
            no_colors: config.no_colors,
            currency: config.currency.clone(),
            coinmarketcap: config.coinmarketcap.as_ref().and_then(|k| k.resolve(secrets)),
            token: config.token.clone(),
        }
    }
}

/// Read-only view over the configuration with every secret resolved.
///
/// Built once at process start and passed by reference; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ConfigProvider {
    default_network: String,
    development_networks: BTreeSet<String>,
    profiles: BTreeMap<String, NetworkProfile>,
    named_accounts: NamedAccounts,
    etherscan_keys: BTreeMap<String, Secret>,
    etherscan_urls: BTreeMap<String, String>,
    gas_reporter: GasReporterSettings,
    solidity_version: String,
    artifacts_dir: PathBuf,
    deployments_dir: PathBuf,
    timeout: Duration,
}

impl ConfigProvider {
    /// Resolve `config` against `secrets`. Missing secrets become absent values.
    pub fn new(config: &DeployConfig, secrets: &impl SecretProvider) -> Self {
        let profiles = config
            .networks
            .iter()
            .map(|(name, network)| {
                (
                    name.clone(),
                    NetworkProfile::resolve(name, network, secrets),
                )
            })
            .collect();

        let etherscan_keys = config
            .etherscan
            .api_key
            .iter()
            .filter_map(|(network, key)| Some((network.clone(), key.resolve(secrets)?)))
            .collect();

        Self {
            default_network: config.default_network.clone(),
            development_networks: config.development_networks.iter().cloned().collect(),
            profiles,
            named_accounts: config.named_accounts.clone(),
            etherscan_keys,
            etherscan_urls: config.etherscan.api_url.clone(),
            gas_reporter: GasReporterSettings::resolve(&config.gas_reporter, secrets),
            solidity_version: config.solidity.version.clone(),
            artifacts_dir: config.solidity.artifacts.clone(),
            deployments_dir: config.deployments_dir.clone(),
            timeout: Duration::from_millis(config.runner.timeout_ms),
        }
    }

    /// The profile of network `name`.
    pub fn profile_for(&self, name: &str) -> Result<&NetworkProfile, DeployError> {
        self.profiles
            .get(name)
            .ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
    }

    /// All profiles, ordered by name.
    pub fn profiles(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }

    /// Whether `name` is an ephemeral/local network. Verification is skipped there.
    pub fn is_development(&self, name: &str) -> bool {
        self.development_networks.contains(name)
    }

    pub fn default_network(&self) -> &str {
        &self.default_network
    }

    pub fn named_accounts(&self) -> &NamedAccounts {
        &self.named_accounts
    }

    /// Block explorer API key for `network`.
    pub fn etherscan_api_key(&self, network: &str) -> Option<&Secret> {
        self.etherscan_keys.get(network)
    }

    /// Configured block explorer endpoint for `network`, overriding the built-in one.
    pub fn etherscan_api_url(&self, network: &str) -> Option<&str> {
        self.etherscan_urls.get(network).map(String::as_str)
    }

    pub fn gas_reporter(&self) -> &GasReporterSettings {
        &self.gas_reporter
    }

    pub fn solidity_version(&self) -> &str {
        &self.solidity_version
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn deployments_dir(&self) -> &Path {
        &self.deployments_dir
    }

    /// Upper bound for confirmation and verification polling.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticSecrets;

    fn provider(secrets: StaticSecrets) -> ConfigProvider {
        ConfigProvider::new(&DeployConfig::default(), &secrets)
    }

    #[test]
    fn test_every_profile_requires_at_least_one_confirmation() {
        let provider = provider(StaticSecrets::new());
        for profile in provider.profiles() {
            assert!(profile.required_confirmations >= 1, "{}", profile.name);
        }
        assert_eq!(provider.profile_for("goerli").unwrap().required_confirmations, 6);
    }

    #[test]
    fn test_unknown_network() {
        let provider = provider(StaticSecrets::new());
        assert!(matches!(
            provider.profile_for("mainnet"),
            Err(DeployError::UnknownNetwork(name)) if name == "mainnet"
        ));
    }

    #[test]
    fn test_development_classification() {
        let provider = provider(StaticSecrets::new());
        assert!(provider.is_development("hardhat"));
        assert!(provider.is_development("localhost"));
        assert!(provider.is_development("ganache"));
        assert!(!provider.is_development("goerli"));
        assert!(!provider.is_development("arbitrum"));
    }

    #[test]
    fn test_missing_secrets_do_not_fail_loading() {
        let provider = provider(StaticSecrets::new());
        assert_eq!(provider.profile_for("goerli").unwrap().url, None);
        assert!(provider.etherscan_api_key("goerli").is_none());
        assert!(provider.gas_reporter().coinmarketcap.is_none());
    }

    #[test]
    fn test_secrets_are_resolved() {
        let provider = provider(
            StaticSecrets::new()
                .with("GOERLI_URL", "https://goerli.example")
                .with("ETHERSCAN_API_KEY", "KEY"),
        );
        assert_eq!(
            provider.profile_for("goerli").unwrap().url.as_deref(),
            Some("https://goerli.example")
        );
        assert_eq!(provider.etherscan_api_key("goerli").unwrap().expose(), "KEY");
        assert_eq!(provider.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_empty_output_file_means_stdout() {
        let mut config = DeployConfig::default();
        config.gas_reporter.output_file = Some(PathBuf::new());
        let unset = ConfigProvider::new(&config, &StaticSecrets::new());
        assert_eq!(unset.gas_reporter().output_file, None);

        assert_eq!(
            provider(StaticSecrets::new()).gas_reporter().output_file,
            Some(PathBuf::from("gas-report.txt"))
        );
    }
}
