//! Named accounts: logical roles mapped to account indices per network.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::{DeployError, NetworkProfile};

/// Logical account roles used by deploy scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum AccountRole {
    Deployer,
    Player,
}

/// Index assignment for one role: a default plus per-network overrides.
///
/// ```toml
/// [named_accounts.deployer]
/// default = 0
/// goerli = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccount {
    pub default: usize,
    #[serde(flatten)]
    pub networks: BTreeMap<String, usize>,
}

impl NamedAccount {
    pub fn new(default: usize) -> Self {
        Self {
            default,
            networks: BTreeMap::new(),
        }
    }

    /// The account index to use on `network`.
    pub fn index_for(&self, network: &str) -> usize {
        self.networks.get(network).copied().unwrap_or(self.default)
    }
}

/// Role-to-index mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAccounts {
    pub deployer: NamedAccount,
    pub player: NamedAccount,
}

impl Default for NamedAccounts {
    fn default() -> Self {
        Self {
            deployer: NamedAccount::new(0),
            player: NamedAccount::new(1),
        }
    }
}

impl NamedAccounts {
    fn get(&self, role: AccountRole) -> &NamedAccount {
        match role {
            AccountRole::Deployer => &self.deployer,
            AccountRole::Player => &self.player,
        }
    }

    /// Account index for `role` on `network`.
    pub fn index_of(&self, role: AccountRole, network: &str) -> usize {
        self.get(role).index_for(network)
    }

    /// Resolve `role` against the accounts of `profile`.
    pub fn resolve(
        &self,
        role: AccountRole,
        profile: &NetworkProfile,
    ) -> Result<Account, DeployError> {
        let index = self.index_of(role, &profile.name);
        let signer = profile.signer_at(index)?;

        Ok(Account {
            role,
            index,
            signer,
        })
    }
}

/// An account resolved on a given network, able to sign.
#[derive(Debug, Clone)]
pub struct Account {
    pub role: AccountRole,
    pub index: usize,
    pub signer: PrivateKeySigner,
}

impl Account {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}
