//! Error taxonomy surfaced by the deployment library.

use alloy_core::primitives::Address;

/// Errors surfaced by the config provider, the deploy step and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A value read from the environment (or a config literal) was absent when
    /// something tried to use it.
    #[error("missing configuration value: {0}")]
    ConfigMissing(String),

    /// A configured value is present but unusable (bad key, bad URL...).
    #[error("invalid configuration value: {0}")]
    InvalidConfig(String),

    /// The requested network has no profile.
    #[error("unknown network `{0}`")]
    UnknownNetwork(String),

    /// The on-chain contract creation failed.
    #[error("failed to deploy {contract}: {reason}")]
    Deployment { contract: String, reason: String },

    /// The block explorer refused or failed to verify the contract.
    #[error("failed to verify {address}: {reason}")]
    Verification { address: Address, reason: String },
}

impl DeployError {
    /// Build a [`DeployError::Deployment`] from any displayable error, keeping its context chain.
    pub fn deployment(contract: impl Into<String>, err: impl Into<anyhow::Error>) -> Self {
        Self::Deployment {
            contract: contract.into(),
            reason: format!("{:#}", err.into()),
        }
    }

    /// Build a [`DeployError::Verification`] from any displayable error, keeping its context chain.
    pub fn verification(address: Address, err: impl Into<anyhow::Error>) -> Self {
        Self::Verification {
            address,
            reason: format!("{:#}", err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_deployment_error_keeps_context_chain() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("insufficient funds"));
        let err = err.context("Failed to send transaction").unwrap_err();

        let err = DeployError::deployment("TicTacToe", err);
        assert_eq!(
            err.to_string(),
            "failed to deploy TicTacToe: Failed to send transaction: insufficient funds"
        );
    }

    #[test]
    fn test_verification_error_mentions_address() {
        let err = DeployError::verification(Address::ZERO, anyhow::anyhow!("bad request"));
        assert!(err.to_string().contains("0x0000000000000000000000000000000000000000"));
        assert!(err.to_string().ends_with("bad request"));
    }
}
