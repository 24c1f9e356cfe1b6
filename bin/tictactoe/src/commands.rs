use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use tictactoe_deploy::{
    ConfigProvider, DeployContext, DeployRunner, DeploymentRecord, DeploymentStore,
    EtherscanVerifier, RpcFacility, SCRIPTS, VerificationStatus, Verifier, VerifyRequest, sizer,
};

use crate::cli::{DeployArgs, VerifyArgs};

pub async fn deploy(config: &ConfigProvider, args: DeployArgs) -> Result<()> {
    let network = args
        .network
        .unwrap_or_else(|| config.default_network().to_string());
    let profile = config.profile_for(&network)?;

    tracing::info!(
        network = %network,
        chain_id = profile.chain_id,
        tags = ?args.tags,
        "Deploying..."
    );

    let facility = RpcFacility::new(profile, config.artifacts_dir(), config.deployments_dir())?
        .redeploy(args.redeploy)
        .timeout(config.timeout());
    let verifier = EtherscanVerifier::new(&network, config)?;

    let records = DeployRunner::new(DeployContext {
        config,
        network: &network,
        facility: &facility,
        verifier: &verifier,
    })
    .tags(args.tags)
    .strict_verify(args.strict_verify)
    .run()
    .await?;

    if !records.is_empty() {
        println!("{}", summary(&records));
    }

    Ok(())
}

fn summary(records: &[DeploymentRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Contract",
        "Address",
        "Transaction",
        "Confirmations",
        "Verification",
    ]);

    for record in records {
        let verification = match &record.verification {
            VerificationStatus::Skipped => "skipped".to_string(),
            VerificationStatus::Verified => "verified".to_string(),
            VerificationStatus::Failed(reason) => format!("failed: {reason}"),
        };

        table.add_row(vec![
            if record.reused {
                format!("{} (reused)", record.contract_name)
            } else {
                record.contract_name.clone()
            },
            record.deployed_address.to_string(),
            record.transaction_hash.to_string(),
            record.transaction_confirmations.to_string(),
            verification,
        ]);
    }

    table.to_string()
}

pub async fn verify(config: &ConfigProvider, args: VerifyArgs) -> Result<()> {
    let profile = config.profile_for(&args.network)?;

    let address = match args.address {
        Some(address) => address,
        None => {
            DeploymentStore::new(config.deployments_dir(), &args.network, profile.chain_id)
                .load(&args.contract)?
                .with_context(|| {
                    format!(
                        "No recorded deployment of {} on {}, pass --address",
                        args.contract, args.network
                    )
                })?
                .address
        }
    };

    let constructor_args = SCRIPTS
        .iter()
        .find(|script| script.contract == args.contract)
        .map(|script| (script.args)())
        .unwrap_or_default();

    EtherscanVerifier::new(&args.network, config)?
        .verify(VerifyRequest {
            contract: args.contract,
            address,
            args: constructor_args,
        })
        .await?;

    Ok(())
}

pub fn size(config: &ConfigProvider) -> Result<()> {
    let sizes = sizer::contract_sizes(config.artifacts_dir())?;
    println!("{}", sizer::render(&sizes));

    for size in sizes.iter().filter(|size| size.exceeds_limit()) {
        tracing::warn!(
            contract = %size.name,
            size = size.runtime_size,
            limit = sizer::CONTRACT_SIZE_LIMIT,
            "Contract exceeds the deployable size limit"
        );
    }

    Ok(())
}

pub fn networks(config: &ConfigProvider) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Network",
        "Chain ID",
        "Confirmations",
        "RPC url",
        "Accounts",
        "Explorer key",
        "Development",
    ]);

    let status = |set: bool| if set { "set" } else { "missing" };

    for profile in config.profiles() {
        let accounts = if profile.account_keys.is_empty() {
            format!("mnemonic ({})", status(profile.mnemonic.is_some()))
        } else {
            let set = profile.account_keys.iter().filter(|key| key.is_some()).count();
            format!("{set}/{} keys", profile.account_keys.len())
        };

        table.add_row(vec![
            if profile.name == config.default_network() {
                format!("{} (default)", profile.name)
            } else {
                profile.name.clone()
            },
            profile.chain_id.to_string(),
            profile.required_confirmations.to_string(),
            status(profile.url.is_some()).to_string(),
            accounts,
            status(config.etherscan_api_key(&profile.name).is_some()).to_string(),
            config.is_development(&profile.name).to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}
