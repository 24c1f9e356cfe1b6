//! Etherscan-compatible verification API client.

use std::path::PathBuf;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;

use super::{Verifier, VerifyRequest};
use crate::{ConfigProvider, ContractArtifact, DeployError, Secret, encode_constructor_args, rpc};

/// Interval between two `checkverifystatus` polls.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Etherscan's multichain API, selecting the explorer with a `chainid` parameter.
const ETHERSCAN_V2_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Built-in API endpoint of the explorer of `chain_id`.
pub fn default_api_url(chain_id: u64) -> String {
    format!("{ETHERSCAN_V2_API_URL}?chainid={chain_id}")
}

/// Envelope of every Etherscan API response.
#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

#[derive(Debug, thiserror::Error)]
enum EtherscanError {
    #[error("explorer has not indexed the contract yet: {0}")]
    NotIndexed(String),
    #[error("explorer rejected the verification request: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl EtherscanError {
    fn is_retryable(&self) -> bool {
        matches!(self, EtherscanError::NotIndexed(_))
    }
}

/// Outcome of a verification submission.
#[derive(Debug, PartialEq, Eq)]
enum Submission {
    /// Queued under this GUID.
    Queued(String),
    AlreadyVerified,
}

/// Outcome of a `checkverifystatus` poll.
#[derive(Debug, PartialEq, Eq)]
enum CheckStatus {
    Pending,
    Verified,
    Failed(String),
}

fn classify_submission(response: EtherscanResponse) -> Result<Submission, EtherscanError> {
    if response.status == "1" {
        return Ok(Submission::Queued(response.result));
    }

    let result = response.result.to_lowercase();
    if result.contains("already verified") {
        Ok(Submission::AlreadyVerified)
    } else if result.contains("unable to locate contractcode")
        || result.contains("does not have bytecode")
    {
        Err(EtherscanError::NotIndexed(response.result))
    } else {
        Err(EtherscanError::Rejected(format!(
            "{}: {}",
            response.message, response.result
        )))
    }
}

fn classify_status(response: EtherscanResponse) -> CheckStatus {
    let result = response.result.to_lowercase();
    if result.contains("pending") {
        CheckStatus::Pending
    } else if response.status == "1" || result.contains("already verified") {
        CheckStatus::Verified
    } else {
        CheckStatus::Failed(response.result)
    }
}

/// [`Verifier`] for Etherscan and its forks (Arbiscan, Polygonscan...).
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    network: String,
    api_url: Option<String>,
    api_key: Option<Secret>,
    artifacts_dir: PathBuf,
    solidity_version: String,
    timeout: Duration,
    poll_interval: Duration,
    backoff: ExponentialBuilder,
}

impl EtherscanVerifier {
    /// Verifier for `network`. A missing API key or endpoint is reported on first use.
    pub fn new(network: &str, config: &ConfigProvider) -> Result<Self, DeployError> {
        let client = rpc::create_client()
            .map_err(|e| DeployError::InvalidConfig(format!("{e:#}")))?;

        let api_url = config
            .etherscan_api_url(network)
            .map(str::to_string)
            .or_else(|| {
                config
                    .profile_for(network)
                    .ok()
                    .map(|profile| default_api_url(profile.chain_id))
            });

        Ok(Self {
            client,
            network: network.to_string(),
            api_url,
            api_key: config.etherscan_api_key(network).cloned(),
            artifacts_dir: config.artifacts_dir().to_path_buf(),
            solidity_version: config.solidity_version().to_string(),
            timeout: config.timeout(),
            poll_interval: STATUS_POLL_INTERVAL,
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(5))
                .with_max_times(5),
        })
    }

    async fn submit(
        &self,
        api_url: &str,
        form: &[(&str, String)],
    ) -> Result<Submission, EtherscanError> {
        let response: EtherscanResponse = self
            .client
            .post(api_url)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        classify_submission(response)
    }

    async fn check(
        &self,
        api_url: &str,
        api_key: &Secret,
        guid: &str,
    ) -> Result<CheckStatus, EtherscanError> {
        let response: EtherscanResponse = self
            .client
            .get(api_url)
            .query(&[
                ("apikey", api_key.expose()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(classify_status(response))
    }

    async fn submit_and_wait(
        &self,
        api_url: &str,
        api_key: &Secret,
        request: &VerifyRequest,
    ) -> anyhow::Result<()> {
        let artifact = ContractArtifact::load(&self.artifacts_dir, &request.contract)?;
        let build_info = artifact.build_info()?;

        if !build_info.solc_long_version.starts_with(&self.solidity_version) {
            tracing::warn!(
                configured = %self.solidity_version,
                compiled = %build_info.solc_long_version,
                "Artifact was compiled with another solc version than configured"
            );
        }

        let form = vec![
            ("apikey", api_key.expose().to_string()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", request.address.to_string()),
            ("sourceCode", build_info.input.to_string()),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", artifact.qualified_name()),
            (
                "compilerversion",
                format!("v{}", build_info.solc_long_version),
            ),
            // Etherscan's own spelling.
            (
                "constructorArguements",
                hex::encode(encode_constructor_args(&request.args)),
            ),
        ];

        let form = form.as_slice();
        let submission = (move || async move { self.submit(api_url, form).await })
            .retry(self.backoff)
            .when(EtherscanError::is_retryable)
            .notify(|err, delay| {
                tracing::info!(error = %err, delay = ?delay, "Retrying verification submission");
            })
            .await?;

        let guid = match submission {
            Submission::AlreadyVerified => {
                tracing::info!(address = %request.address, "Contract is already verified");
                return Ok(());
            }
            Submission::Queued(guid) => guid,
        };

        tracing::info!(guid = %guid, address = %request.address, "Verification submitted");

        let guid = guid.as_str();
        let outcome = rpc::wait_for(
            "verification result",
            self.timeout,
            self.poll_interval,
            move || async move {
                Ok::<_, anyhow::Error>(match self.check(api_url, api_key, guid).await? {
                    CheckStatus::Pending => None,
                    CheckStatus::Verified => Some(Ok(())),
                    CheckStatus::Failed(reason) => Some(Err(reason)),
                })
            },
        )
        .await?;

        outcome.map_err(|reason| anyhow::anyhow!("Verification failed: {reason}"))
    }
}

impl Verifier for EtherscanVerifier {
    async fn verify(&self, request: VerifyRequest) -> Result<(), DeployError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            DeployError::ConfigMissing(format!("etherscan API key for network `{}`", self.network))
        })?;
        let api_url = self.api_url.as_deref().ok_or_else(|| {
            DeployError::ConfigMissing(format!("etherscan API url for network `{}`", self.network))
        })?;

        tracing::info!(
            contract = %request.contract,
            address = %request.address,
            api_url,
            "Verifying contract"
        );

        self.submit_and_wait(api_url, api_key, &request)
            .await
            .map_err(|e| DeployError::verification(request.address, e))?;

        tracing::info!(address = %request.address, "Contract verified");
        Ok(())
    }
}
