//! The deploy step: deploy one contract, then verify it on live networks.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256},
};

use crate::{
    AccountRole, ConfigProvider, DeployError, DeployRequest, DeploymentFacility, Verifier,
    VerifyRequest,
};

/// Separator logged at the end of every deploy step.
const SEPARATOR: &str = "---------------------------------------";

/// A deploy script: one contract, the arguments to build it with, and the tags
/// used to select it.
#[derive(Debug, Clone, Copy)]
pub struct DeployScript {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub contract: &'static str,
    pub args: fn() -> Vec<DynSolValue>,
}

impl DeployScript {
    /// Whether the script is selected by `tags`. No tags selects everything.
    pub fn matches(&self, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|tag| self.tags.contains(&tag.as_str()))
    }
}

/// The TicTacToe game contract, deployed without constructor arguments.
pub const TICTACTOE: DeployScript = DeployScript {
    name: "deploy-tictactoe",
    tags: &["all", "tictactoe"],
    contract: "TicTacToe",
    args: Vec::new,
};

/// All deploy scripts, in execution order.
pub const SCRIPTS: &[DeployScript] = &[TICTACTOE];

/// What happened to the verification of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Development network, nothing to publish.
    Skipped,
    Verified,
    /// The deployment stands; only the verification failed.
    Failed(String),
}

/// Result of one deploy step.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub constructor_args: Vec<DynSolValue>,
    pub deployer_address: Address,
    pub deployed_address: Address,
    pub transaction_confirmations: u64,
    pub transaction_hash: B256,
    pub gas_used: u64,
    pub gas_price: Option<u128>,
    pub reused: bool,
    pub verification: VerificationStatus,
}

/// Everything the deploy step reads: the config provider, the active network and
/// the injected collaborators.
pub struct DeployContext<'a, F, V> {
    pub config: &'a ConfigProvider,
    pub network: &'a str,
    pub facility: &'a F,
    pub verifier: &'a V,
}

impl<F, V> DeployContext<'_, F, V>
where
    F: DeploymentFacility,
    V: Verifier,
{
    /// Run `script` once.
    ///
    /// A deployment failure is returned as is. A verification failure is recorded in
    /// the returned record instead, so it never hides a successful deployment.
    pub async fn deploy(&self, script: &DeployScript) -> Result<DeploymentRecord, DeployError> {
        let profile = self.config.profile_for(self.network)?;
        let deployer = self
            .config
            .named_accounts()
            .resolve(AccountRole::Deployer, profile)?;

        let args = (script.args)();

        tracing::debug!(
            script = script.name,
            network = self.network,
            chain_id = profile.chain_id,
            deployer = %deployer.address(),
            "Running deploy script"
        );

        let deployer_address = deployer.address();
        let deployed = self
            .facility
            .deploy(DeployRequest {
                contract: script.contract.to_string(),
                args: args.clone(),
                from: deployer,
                confirmations: profile.required_confirmations,
                log: true,
            })
            .await?;

        let verification = if self.config.is_development(self.network) {
            VerificationStatus::Skipped
        } else {
            tracing::info!("Verifying");

            let result = self
                .verifier
                .verify(VerifyRequest {
                    contract: script.contract.to_string(),
                    address: deployed.address,
                    args: args.clone(),
                })
                .await;

            match result {
                Ok(()) => VerificationStatus::Verified,
                Err(e) => {
                    tracing::warn!(
                        contract = script.contract,
                        address = %deployed.address,
                        error = %e,
                        "Verification failed, the deployment is kept"
                    );
                    VerificationStatus::Failed(e.to_string())
                }
            }
        };

        tracing::info!("{SEPARATOR}");

        Ok(DeploymentRecord {
            contract_name: script.contract.to_string(),
            constructor_args: args,
            deployer_address,
            deployed_address: deployed.address,
            transaction_confirmations: deployed.confirmations,
            transaction_hash: deployed.transaction_hash,
            gas_used: deployed.gas_used,
            gas_price: deployed.gas_price,
            reused: deployed.reused,
            verification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DEV_MNEMONIC, DeployConfig, DeployedContract, NetworkConfig, SecretRef, StaticSecrets,
    };
    use alloy_core::primitives::address;
    use std::sync::Mutex;

    const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Facility recording requests and returning a fixed address.
    #[derive(Default)]
    struct RecordingFacility {
        requests: Mutex<Vec<DeployRequest>>,
        fail: bool,
    }

    impl DeploymentFacility for RecordingFacility {
        async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract, DeployError> {
            let confirmations = request.confirmations;
            let contract = request.contract.clone();
            self.requests.lock().unwrap().push(request);

            if self.fail {
                return Err(DeployError::Deployment {
                    contract,
                    reason: "insufficient funds".to_string(),
                });
            }

            Ok(DeployedContract {
                address: Address::repeat_byte(0xaa),
                transaction_hash: B256::repeat_byte(0xbb),
                block_number: 1,
                gas_used: 500_000,
                gas_price: Some(1_000_000_000),
                confirmations,
                reused: false,
            })
        }
    }

    #[derive(Default)]
    struct RecordingVerifier {
        requests: Mutex<Vec<VerifyRequest>>,
        fail: bool,
    }

    impl Verifier for RecordingVerifier {
        async fn verify(&self, request: VerifyRequest) -> Result<(), DeployError> {
            let address = request.address;
            self.requests.lock().unwrap().push(request);

            if self.fail {
                return Err(DeployError::Verification {
                    address,
                    reason: "explorer unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn live_secrets() -> StaticSecrets {
        StaticSecrets::new()
            .with("GOERLI_URL", "https://goerli.example")
            .with("PRIVATE_KEY", ANVIL_KEY_0)
            .with("ETHERSCAN_API_KEY", "KEY")
    }

    async fn run(
        config: &ConfigProvider,
        network: &str,
        facility: &RecordingFacility,
        verifier: &RecordingVerifier,
    ) -> Result<DeploymentRecord, DeployError> {
        DeployContext {
            config,
            network,
            facility,
            verifier,
        }
        .deploy(&TICTACTOE)
        .await
    }

    #[test]
    fn test_tag_selection() {
        assert!(TICTACTOE.matches(&[]));
        assert!(TICTACTOE.matches(&["all".to_string()]));
        assert!(TICTACTOE.matches(&["other".to_string(), "tictactoe".to_string()]));
        assert!(!TICTACTOE.matches(&["highcard".to_string()]));
    }

    #[tokio::test]
    async fn test_development_network_is_not_verified() {
        let config = ConfigProvider::new(&DeployConfig::default(), &StaticSecrets::new());
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier::default();

        let record = run(&config, "hardhat", &facility, &verifier).await.unwrap();

        assert_eq!(record.verification, VerificationStatus::Skipped);
        assert!(verifier.requests.lock().unwrap().is_empty());

        let requests = facility.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].contract, "TicTacToe");
        assert!(requests[0].args.is_empty());
        assert!(requests[0].log);
        // Account #0 of the development mnemonic.
        assert_eq!(
            record.deployer_address,
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[tokio::test]
    async fn test_live_network_verifies_deployed_contract_once() {
        let config = ConfigProvider::new(&DeployConfig::default(), &live_secrets());
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier::default();

        let record = run(&config, "goerli", &facility, &verifier).await.unwrap();

        assert_eq!(record.verification, VerificationStatus::Verified);
        assert!(record.constructor_args.is_empty());
        assert_eq!(record.transaction_confirmations, 6);

        let requests = verifier.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].address, record.deployed_address);
        assert_eq!(requests[0].contract, "TicTacToe");
        assert!(requests[0].args.is_empty());
    }

    #[tokio::test]
    async fn test_unset_confirmations_default_to_one() {
        let mut config = DeployConfig::default();
        config.networks.insert(
            "devnet".to_string(),
            NetworkConfig::new(1234).mnemonic(SecretRef::literal(DEV_MNEMONIC)),
        );
        config.development_networks.push("devnet".to_string());
        let config = ConfigProvider::new(&config, &StaticSecrets::new());
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier::default();

        let record = run(&config, "devnet", &facility, &verifier).await.unwrap();

        assert_eq!(facility.requests.lock().unwrap()[0].confirmations, 1);
        assert_eq!(record.transaction_confirmations, 1);
    }

    #[tokio::test]
    async fn test_verification_failure_keeps_deployment() {
        let config = ConfigProvider::new(&DeployConfig::default(), &live_secrets());
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier {
            fail: true,
            ..Default::default()
        };

        let record = run(&config, "goerli", &facility, &verifier).await.unwrap();

        assert_eq!(record.deployed_address, Address::repeat_byte(0xaa));
        assert!(matches!(
            record.verification,
            VerificationStatus::Failed(reason) if reason.contains("explorer unavailable")
        ));
    }

    #[tokio::test]
    async fn test_deployment_failure_propagates() {
        let config = ConfigProvider::new(&DeployConfig::default(), &live_secrets());
        let facility = RecordingFacility {
            fail: true,
            ..Default::default()
        };
        let verifier = RecordingVerifier::default();

        let result = run(&config, "goerli", &facility, &verifier).await;

        assert!(matches!(result, Err(DeployError::Deployment { .. })));
        assert!(verifier.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_private_key_fails_before_deploying() {
        let secrets = StaticSecrets::new().with("GOERLI_URL", "https://goerli.example");
        let config = ConfigProvider::new(&DeployConfig::default(), &secrets);
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier::default();

        let result = run(&config, "goerli", &facility, &verifier).await;

        assert!(matches!(result, Err(DeployError::ConfigMissing(_))));
        assert!(facility.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_network() {
        let config = ConfigProvider::new(&DeployConfig::default(), &StaticSecrets::new());
        let facility = RecordingFacility::default();
        let verifier = RecordingVerifier::default();

        let result = run(&config, "mainnet", &facility, &verifier).await;
        assert!(matches!(result, Err(DeployError::UnknownNetwork(_))));
    }
}
