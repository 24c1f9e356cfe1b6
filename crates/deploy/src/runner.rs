//! Runs the selected deploy scripts one after the other.

use anyhow::Result;

use crate::{
    DeployContext, DeployScript, DeploymentFacility, DeploymentRecord, SCRIPTS, VerificationStatus,
    Verifier, gas_report,
};

/// Deploy script runner.
pub struct DeployRunner<'a, F, V> {
    ctx: DeployContext<'a, F, V>,
    tags: Vec<String>,
    strict_verify: bool,
}

impl<'a, F, V> DeployRunner<'a, F, V>
where
    F: DeploymentFacility,
    V: Verifier,
{
    /// Runner over every registered script.
    pub fn new(ctx: DeployContext<'a, F, V>) -> Self {
        Self {
            ctx,
            tags: Vec::new(),
            strict_verify: false,
        }
    }

    /// Only run scripts carrying one of `tags`. Empty means all.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Fail the run when a verification failed.
    pub fn strict_verify(mut self, strict_verify: bool) -> Self {
        self.strict_verify = strict_verify;
        self
    }

    /// Run the selected scripts in registry order.
    ///
    /// The first deployment failure aborts the run. The gas report, when enabled, covers
    /// the scripts that ran.
    pub async fn run(&self) -> Result<Vec<DeploymentRecord>> {
        let selected: Vec<&DeployScript> = SCRIPTS
            .iter()
            .filter(|script| script.matches(&self.tags))
            .collect();

        if selected.is_empty() {
            tracing::warn!(tags = ?self.tags, "No deploy script matches the requested tags");
            return Ok(Vec::new());
        }

        tracing::info!(
            network = self.ctx.network,
            scripts = selected.len(),
            "Running deploy scripts"
        );

        let mut records = Vec::with_capacity(selected.len());
        for script in selected {
            records.push(self.ctx.deploy(script).await?);
        }

        let gas_reporter = self.ctx.config.gas_reporter();
        if gas_reporter.enabled {
            gas_report::write_report(&records, gas_reporter).await?;
        }

        if self.strict_verify {
            let failed: Vec<&str> = records
                .iter()
                .filter(|record| matches!(record.verification, VerificationStatus::Failed(_)))
                .map(|record| record.contract_name.as_str())
                .collect();

            if !failed.is_empty() {
                anyhow::bail!("Verification failed for {}", failed.join(", "));
            }
        }

        Ok(records)
    }
}
