//! tictactoe-deploy - Deployment library for the TicTacToe contract.
//!
//! This crate loads the network configuration, deploys the contract through a
//! [`DeploymentFacility`] and publishes its source through a [`Verifier`] on live
//! networks.

mod accounts;
pub use accounts::{Account, AccountRole, NamedAccount, NamedAccounts};

mod artifact;
pub use artifact::{BuildInfo, ContractArtifact, encode_constructor_args};

mod config;
pub use config::{
    CONFIG_FILENAME, DEFAULT_TIMEOUT_MS, DEV_MNEMONIC, DeployConfig, ENV_PREFIX, EtherscanConfig,
    GasReporterConfig, NetworkConfig, RunnerConfig, SolidityConfig,
};

pub mod deployments;
pub use deployments::{DeploymentStore, StoredDeployment};

mod error;
pub use error::DeployError;

mod facility;
pub use facility::{DeployRequest, DeployedContract, DeploymentFacility, RpcFacility};

pub mod gas_report;

mod network;
pub use network::{DEFAULT_CONFIRMATIONS, NetworkProfile};

mod provider;
pub use provider::{ConfigProvider, GasReporterSettings};

pub mod rpc;

mod runner;
pub use runner::DeployRunner;

mod secrets;
pub use secrets::{EnvSecrets, Secret, SecretProvider, SecretRef, StaticSecrets};

pub mod sizer;

mod step;
pub use step::{
    DeployContext, DeployScript, DeploymentRecord, SCRIPTS, TICTACTOE, VerificationStatus,
};

mod verify;
pub use verify::{EtherscanVerifier, Verifier, VerifyRequest, default_api_url};
