//! Resolved network profiles.

use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};

use crate::{DeployError, NetworkConfig, Secret, SecretProvider};

/// Confirmations used when a network does not configure any.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// A network as seen by the deploy step: immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    /// JSON-RPC endpoint, absent when its variable is unset.
    pub url: Option<String>,
    /// Always at least 1.
    pub required_confirmations: u64,
    /// Private keys in index order. An absent key fails only when signing with it.
    pub account_keys: Vec<Option<Secret>>,
    pub mnemonic: Option<Secret>,
}

impl NetworkProfile {
    /// Resolve `config` for the network `name`.
    pub fn resolve(name: &str, config: &NetworkConfig, secrets: &impl SecretProvider) -> Self {
        let required_confirmations = match config.block_confirmations {
            Some(0) => {
                tracing::warn!(
                    network = name,
                    "block_confirmations = 0 is not allowed, using {DEFAULT_CONFIRMATIONS}"
                );
                DEFAULT_CONFIRMATIONS
            }
            Some(confirmations) => confirmations,
            None => DEFAULT_CONFIRMATIONS,
        };

        Self {
            name: name.to_string(),
            chain_id: config.chain_id,
            url: config
                .url
                .as_ref()
                .and_then(|url| url.resolve(secrets))
                .map(|url| url.expose().to_string()),
            required_confirmations,
            account_keys: config
                .accounts
                .iter()
                .map(|key| key.resolve(secrets))
                .collect(),
            mnemonic: config.mnemonic.as_ref().and_then(|m| m.resolve(secrets)),
        }
    }

    /// The RPC endpoint, or [`DeployError::ConfigMissing`] when unset.
    pub fn rpc_url(&self) -> Result<&str, DeployError> {
        self.url.as_deref().ok_or_else(|| {
            DeployError::ConfigMissing(format!("RPC url for network `{}`", self.name))
        })
    }

    /// The signer of account `index`.
    ///
    /// Configured private keys take precedence; without any, accounts are derived
    /// from the mnemonic along `m/44'/60'/0'/0/<index>`.
    pub fn signer_at(&self, index: usize) -> Result<PrivateKeySigner, DeployError> {
        if !self.account_keys.is_empty() {
            let key = self.account_keys.get(index).ok_or_else(|| {
                DeployError::ConfigMissing(format!(
                    "account #{index} on network `{}` ({} configured)",
                    self.name,
                    self.account_keys.len()
                ))
            })?;

            let key = key.as_ref().ok_or_else(|| {
                DeployError::ConfigMissing(format!(
                    "private key of account #{index} on network `{}`",
                    self.name
                ))
            })?;

            return key.expose().parse::<PrivateKeySigner>().map_err(|e| {
                DeployError::InvalidConfig(format!(
                    "private key of account #{index} on network `{}`: {e}",
                    self.name
                ))
            });
        }

        let mnemonic = self.mnemonic.as_ref().ok_or_else(|| {
            DeployError::ConfigMissing(format!(
                "accounts or mnemonic for network `{}`",
                self.name
            ))
        })?;

        let invalid = |e: alloy_signer_local::LocalSignerError| {
            DeployError::InvalidConfig(format!("mnemonic of network `{}`: {e}", self.name))
        };

        let index = u32::try_from(index).map_err(|_| {
            DeployError::InvalidConfig(format!("account index {index} is out of range"))
        })?;

        MnemonicBuilder::<English>::default()
            .phrase(mnemonic.expose())
            .index(index)
            .map_err(invalid)?
            .build()
            .map_err(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEV_MNEMONIC, SecretRef, StaticSecrets};
    use alloy_core::primitives::address;

    const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_confirmations_default_to_one() {
        let profile = NetworkProfile::resolve("x", &NetworkConfig::new(1), &StaticSecrets::new());
        assert_eq!(profile.required_confirmations, 1);

        let config = NetworkConfig::new(1).block_confirmations(0);
        let profile = NetworkProfile::resolve("x", &config, &StaticSecrets::new());
        assert_eq!(profile.required_confirmations, 1);

        let config = NetworkConfig::new(1).block_confirmations(6);
        let profile = NetworkProfile::resolve("x", &config, &StaticSecrets::new());
        assert_eq!(profile.required_confirmations, 6);
    }

    #[test]
    fn test_missing_env_values_resolve_to_absent() {
        let config = NetworkConfig::new(5)
            .url(SecretRef::env("GOERLI_URL"))
            .account(SecretRef::env("PRIVATE_KEY"));
        let profile = NetworkProfile::resolve("goerli", &config, &StaticSecrets::new());

        assert_eq!(profile.url, None);
        assert_eq!(profile.account_keys, vec![None]);
        assert!(matches!(profile.rpc_url(), Err(DeployError::ConfigMissing(_))));
        assert!(matches!(profile.signer_at(0), Err(DeployError::ConfigMissing(_))));
    }

    #[test]
    fn test_signer_from_private_key() {
        let config = NetworkConfig::new(5).account(SecretRef::env("PRIVATE_KEY"));
        let secrets = StaticSecrets::new().with("PRIVATE_KEY", ANVIL_KEY_0);
        let profile = NetworkProfile::resolve("goerli", &config, &secrets);

        let signer = profile.signer_at(0).unwrap();
        assert_eq!(
            signer.address(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert!(matches!(profile.signer_at(1), Err(DeployError::ConfigMissing(_))));
    }

    #[test]
    fn test_invalid_private_key() {
        let config = NetworkConfig::new(5).account(SecretRef::literal("not-a-key"));
        let profile = NetworkProfile::resolve("goerli", &config, &StaticSecrets::new());
        assert!(matches!(profile.signer_at(0), Err(DeployError::InvalidConfig(_))));
    }

    #[test]
    fn test_signer_from_dev_mnemonic() {
        let config = NetworkConfig::new(31337).mnemonic(SecretRef::literal(DEV_MNEMONIC));
        let profile = NetworkProfile::resolve("hardhat", &config, &StaticSecrets::new());

        assert_eq!(
            profile.signer_at(0).unwrap().address(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert_eq!(
            profile.signer_at(1).unwrap().address(),
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[test]
    fn test_no_accounts_at_all() {
        let profile = NetworkProfile::resolve("x", &NetworkConfig::new(1), &StaticSecrets::new());
        assert!(matches!(profile.signer_at(0), Err(DeployError::ConfigMissing(_))));
    }
}
