//! Deployment facility backed by a JSON-RPC endpoint.
//!
//! Creation transactions are signed locally (legacy, EIP-155) so the same path works
//! against a local node and a hosted endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U64, U128};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use super::{DeployRequest, DeployedContract, DeploymentFacility};
use crate::{
    ContractArtifact, DeployError, DeploymentStore, NetworkProfile, StoredDeployment,
    deployments::code_hash, rpc,
};

/// Headroom added on top of the node's gas estimate, in percent.
const GAS_LIMIT_MARGIN_PERCENT: u64 = 120;

/// Default bound for receipt and confirmation polling.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// The part of a transaction receipt the facility needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    block_number: U64,
    #[serde(default)]
    status: Option<U64>,
    #[serde(default)]
    contract_address: Option<Address>,
    gas_used: U64,
    #[serde(default)]
    effective_gas_price: Option<U128>,
}

/// Number of confirmations of a transaction mined in `receipt_block` when the head is `head`.
pub(crate) fn confirmations_at(receipt_block: u64, head: u64) -> u64 {
    head.saturating_sub(receipt_block) + 1
}

/// Build and sign a contract creation transaction, returning its hash and raw encoding.
pub(crate) fn sign_creation(
    signer: &PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    init_code: Bytes,
) -> Result<(B256, Bytes)> {
    let tx = TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Create,
        input: init_code,
        ..Default::default()
    };

    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .context("Failed to sign deployment transaction")?;
    let signed = tx.into_signed(signature);
    let raw: Bytes = signed.encoded_2718().into();

    Ok((*signed.hash(), raw))
}

/// [`DeploymentFacility`] talking to a node over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcFacility {
    client: reqwest::Client,
    url: String,
    chain_id: u64,
    artifacts_dir: PathBuf,
    store: DeploymentStore,
    redeploy: bool,
    timeout: Duration,
    poll_interval: Duration,
}

impl RpcFacility {
    /// Facility for `profile`, reading artifacts from `artifacts_dir` and recording
    /// deployments under `deployments_dir`.
    ///
    /// Fails with [`DeployError::ConfigMissing`] when the network has no RPC url.
    pub fn new(
        profile: &NetworkProfile,
        artifacts_dir: &Path,
        deployments_dir: &Path,
    ) -> Result<Self, DeployError> {
        let url = profile.rpc_url()?;
        url::Url::parse(url).map_err(|e| {
            DeployError::InvalidConfig(format!("RPC url of network `{}`: {e}", profile.name))
        })?;
        let client = rpc::create_client()
            .map_err(|e| DeployError::InvalidConfig(format!("{e:#}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
            chain_id: profile.chain_id,
            artifacts_dir: artifacts_dir.to_path_buf(),
            store: DeploymentStore::new(deployments_dir, &profile.name, profile.chain_id),
            redeploy: false,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: rpc::DEFAULT_POLL_INTERVAL,
        })
    }

    /// Always send a new transaction, even when a matching deployment is recorded.
    pub fn redeploy(mut self, redeploy: bool) -> Self {
        self.redeploy = redeploy;
        self
    }

    /// Bound for receipt and confirmation polling.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
        rpc::json_rpc_call(&self.client, &self.url, method, params).await
    }

    /// A recorded deployment of the same creation code that still has code on chain.
    async fn existing(
        &self,
        request: &DeployRequest,
        hash: &str,
    ) -> Result<Option<StoredDeployment>> {
        let Some(existing) = self.store.load(&request.contract)? else {
            return Ok(None);
        };

        if existing.code_hash != hash {
            tracing::info!(
                contract = %request.contract,
                previous = %existing.address,
                "Creation code changed, deploying a new instance"
            );
            return Ok(None);
        }

        let code: Bytes = self
            .call("eth_getCode", vec![json!(existing.address), json!("latest")])
            .await
            .context("Failed to fetch code of the recorded deployment")?;

        if code.is_empty() {
            tracing::warn!(
                contract = %request.contract,
                address = %existing.address,
                "Recorded deployment has no code on chain, deploying again"
            );
            return Ok(None);
        }

        Ok(Some(existing))
    }

    async fn deploy_contract(&self, request: &DeployRequest) -> Result<DeployedContract> {
        let artifact = ContractArtifact::load(&self.artifacts_dir, &request.contract)?;
        let init_code = artifact.init_code(&request.args);
        let hash = code_hash(&init_code);

        let chain_id: U64 = self
            .call("eth_chainId", vec![])
            .await
            .context("Failed to fetch chain id")?;
        if chain_id.to::<u64>() != self.chain_id {
            anyhow::bail!(
                "RPC endpoint reports chain id {} but the network is configured with {}",
                chain_id,
                self.chain_id
            );
        }

        if !self.redeploy {
            if let Some(existing) = self.existing(request, &hash).await? {
                if request.log {
                    tracing::info!(
                        contract = %request.contract,
                        address = %existing.address,
                        "Reusing {} at {}",
                        request.contract,
                        existing.address
                    );
                }

                return Ok(DeployedContract {
                    address: existing.address,
                    transaction_hash: existing.transaction_hash,
                    block_number: existing.block_number,
                    gas_used: existing.gas_used,
                    gas_price: None,
                    confirmations: request.confirmations,
                    reused: true,
                });
            }
        }

        let from = request.from.address();

        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await
            .context("Failed to fetch deployer nonce")?;
        let nonce = nonce.to::<u64>();

        let gas_price: U128 = self
            .call("eth_gasPrice", vec![])
            .await
            .context("Failed to fetch gas price")?;

        let estimate: U64 = self
            .call(
                "eth_estimateGas",
                vec![json!({ "from": from, "data": init_code })],
            )
            .await
            .context("Failed to estimate deployment gas")?;
        let gas_limit = estimate.to::<u64>() * GAS_LIMIT_MARGIN_PERCENT / 100;

        let (tx_hash, raw) = sign_creation(
            &request.from.signer,
            self.chain_id,
            nonce,
            gas_price.to::<u128>(),
            gas_limit,
            init_code,
        )?;

        if request.log {
            tracing::info!(
                contract = %request.contract,
                deployer = %from,
                tx_hash = %tx_hash,
                expected_address = %from.create(nonce),
                gas_limit,
                "Deploying {} (tx: {})...",
                request.contract,
                tx_hash
            );
        }

        let _: B256 = self
            .call("eth_sendRawTransaction", vec![json!(raw)])
            .await
            .context("Failed to send deployment transaction")?;

        let receipt: TransactionReceipt = rpc::wait_for(
            "deployment receipt",
            self.timeout,
            self.poll_interval,
            move || async move {
                self.call::<Option<TransactionReceipt>>(
                    "eth_getTransactionReceipt",
                    vec![json!(tx_hash)],
                )
                .await
            },
        )
        .await?;

        if receipt.status.map(|s| s.to::<u64>()) == Some(0) {
            anyhow::bail!("Deployment transaction {} reverted", tx_hash);
        }

        let address = receipt
            .contract_address
            .context("Receipt of the deployment transaction has no contract address")?;
        let block_number = receipt.block_number.to::<u64>();

        let required = request.confirmations;
        let confirmations = rpc::wait_for(
            "block confirmations",
            self.timeout,
            self.poll_interval,
            move || async move {
                let head: U64 = self.call("eth_blockNumber", vec![]).await?;
                let seen = confirmations_at(block_number, head.to::<u64>());
                Ok::<_, anyhow::Error>((seen >= required).then_some(seen))
            },
        )
        .await?;

        let deployed = DeployedContract {
            address,
            transaction_hash: tx_hash,
            block_number,
            gas_used: receipt.gas_used.to::<u64>(),
            gas_price: Some(
                receipt
                    .effective_gas_price
                    .map(|p| p.to::<u128>())
                    .unwrap_or(gas_price.to::<u128>()),
            ),
            confirmations,
            reused: false,
        };

        if request.log {
            tracing::info!(
                contract = %request.contract,
                address = %address,
                block = block_number,
                gas_used = deployed.gas_used,
                confirmations,
                "Deployed {} at {}",
                request.contract,
                address
            );
        }

        let stored = StoredDeployment {
            address,
            transaction_hash: tx_hash,
            deployer: from,
            block_number,
            gas_used: deployed.gas_used,
            args: crate::encode_constructor_args(&request.args),
            code_hash: hash,
            deployed_at: 0,
            tool_version: String::new(),
        }
        .stamped();
        self.store.save(&request.contract, &stored)?;

        Ok(deployed)
    }
}

impl DeploymentFacility for RpcFacility {
    async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract, DeployError> {
        self.deploy_contract(&request)
            .await
            .map_err(|e| DeployError::deployment(&request.contract, e))
    }
}
