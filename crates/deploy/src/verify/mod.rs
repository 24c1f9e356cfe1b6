//! Source verification on block explorers.

mod etherscan;

use std::future::Future;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};

pub use etherscan::{EtherscanVerifier, default_api_url};

use crate::DeployError;

/// A contract to publish the source of.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    /// Contract (artifact) name.
    pub contract: String,
    pub address: Address,
    /// The constructor arguments the contract was deployed with.
    pub args: Vec<DynSolValue>,
}

/// Collaborator publishing contract sources to a block explorer.
pub trait Verifier: Send + Sync {
    /// Verify the contract at `request.address`.
    ///
    /// Fails with [`DeployError::Verification`], or [`DeployError::ConfigMissing`]
    /// when the explorer is not configured for the network.
    fn verify(
        &self,
        request: VerifyRequest,
    ) -> impl Future<Output = Result<(), DeployError>> + Send;
}
