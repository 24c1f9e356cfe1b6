//! The deployment facility: submits contract creations and waits for confirmations.

mod rpc;

use std::future::Future;

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256},
};

pub use rpc::RpcFacility;

use crate::{Account, DeployError};

/// What to deploy, from whom, and how long to wait.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Contract (artifact) name.
    pub contract: String,
    pub args: Vec<DynSolValue>,
    pub from: Account,
    /// Confirmations to wait for, at least 1.
    pub confirmations: u64,
    /// Log progress at info level.
    pub log: bool,
}

/// A deployed contract reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// Price paid per gas unit, in wei. Unknown for reused deployments.
    pub gas_price: Option<u128>,
    /// Confirmations observed before returning.
    pub confirmations: u64,
    /// Whether an existing deployment was reused instead of sending a transaction.
    pub reused: bool,
}

/// Collaborator that creates contracts on chain.
pub trait DeploymentFacility: Send + Sync {
    /// Deploy `request.contract`, returning once `request.confirmations` are reached.
    ///
    /// Fails with [`DeployError::Deployment`] when the contract could not be created.
    fn deploy(
        &self,
        request: DeployRequest,
    ) -> impl Future<Output = Result<DeployedContract, DeployError>> + Send;
}
