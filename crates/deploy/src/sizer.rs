//! Runtime bytecode sizes against the EIP-170 contract size limit.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Table, presets::UTF8_FULL};

use crate::ContractArtifact;

/// Maximum runtime bytecode size accepted by the EVM (EIP-170).
pub const CONTRACT_SIZE_LIMIT: usize = 24_576;

/// Runtime and creation code sizes of one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSize {
    pub name: String,
    pub runtime_size: usize,
    pub init_size: usize,
}

impl ContractSize {
    pub fn from_artifact(artifact: &ContractArtifact) -> Self {
        Self {
            name: artifact.contract_name.clone(),
            runtime_size: artifact.deployed_bytecode.len(),
            init_size: artifact.bytecode.len(),
        }
    }

    pub fn exceeds_limit(&self) -> bool {
        self.runtime_size > CONTRACT_SIZE_LIMIT
    }

    pub fn runtime_kib(&self) -> f64 {
        self.runtime_size as f64 / 1024.0
    }

    pub fn init_kib(&self) -> f64 {
        self.init_size as f64 / 1024.0
    }
}

/// Sizes of every deployable artifact under `artifacts_dir`, by name.
///
/// Interfaces and abstract contracts have no runtime code and are left out.
pub fn contract_sizes(artifacts_dir: &Path) -> Result<Vec<ContractSize>> {
    let mut sizes: Vec<ContractSize> = ContractArtifact::load_all(artifacts_dir)?
        .iter()
        .filter(|artifact| !artifact.deployed_bytecode.is_empty())
        .map(ContractSize::from_artifact)
        .collect();

    sizes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sizes)
}

/// Render `sizes` as a table, marking oversize contracts.
pub fn render(sizes: &[ContractSize]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            "Contract",
            "Size (KiB)",
            "Initcode (KiB)",
            "Limit (KiB)",
            "",
        ]);

    let limit = format!("{:.3}", CONTRACT_SIZE_LIMIT as f64 / 1024.0);
    for size in sizes {
        let marker = size.exceeds_limit().then_some("oversize").unwrap_or_default();
        table.add_row(vec![
            size.name.clone(),
            format!("{:.3}", size.runtime_kib()),
            format!("{:.3}", size.init_kib()),
            limit.clone(),
            marker.to_string(),
        ]);
    }

    table.to_string()
}
