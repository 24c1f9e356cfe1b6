//! Persisted deployment records.
//!
//! Each network gets a directory under the deployments root, holding one JSON file
//! per contract plus a `.chainId` file. A stored record lets a later run reuse the
//! deployment instead of sending another transaction, as long as the creation code
//! hash is unchanged.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the file recording the chain id of a network directory.
const CHAIN_ID_FILENAME: &str = ".chainId";

/// Compute the SHA-256 of a contract's creation code (including constructor arguments).
pub fn code_hash(init_code: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(init_code);
    hex::encode(hasher.finalize())
}

/// A deployment as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDeployment {
    pub address: Address,
    pub transaction_hash: B256,
    pub deployer: Address,
    pub block_number: u64,
    pub gas_used: u64,
    /// ABI-encoded constructor arguments.
    pub args: Bytes,
    /// SHA-256 of the creation code, see [`code_hash`].
    pub code_hash: String,
    /// Unix timestamp of the deployment.
    pub deployed_at: i64,
    pub tool_version: String,
}

impl StoredDeployment {
    /// Stamp the record with the current time and crate version.
    pub fn stamped(mut self) -> Self {
        self.deployed_at = chrono::Utc::now().timestamp();
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
        self
    }
}

/// Deployment records of one network.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    dir: PathBuf,
    chain_id: u64,
}

impl DeploymentStore {
    /// Store for `network` under `root`.
    pub fn new(root: &Path, network: &str, chain_id: u64) -> Self {
        Self {
            dir: root.join(network),
            chain_id,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, contract: &str) -> PathBuf {
        self.dir.join(format!("{contract}.json"))
    }

    /// Load the record of `contract`.
    ///
    /// Returns `None` when nothing was stored, or when the directory was written for
    /// another chain (a reset local node, a re-pointed network name).
    pub fn load(&self, contract: &str) -> Result<Option<StoredDeployment>> {
        let path = self.path_for(contract);
        if !path.exists() {
            return Ok(None);
        }

        let chain_id_path = self.dir.join(CHAIN_ID_FILENAME);
        let stored_chain_id = std::fs::read_to_string(&chain_id_path)
            .ok()
            .and_then(|id| id.trim().parse::<u64>().ok());

        if stored_chain_id != Some(self.chain_id) {
            tracing::warn!(
                dir = %self.dir.display(),
                expected = self.chain_id,
                found = ?stored_chain_id,
                "Ignoring deployments recorded for another chain"
            );
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read deployment {}", path.display()))?;
        let deployment = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deployment {}", path.display()))?;

        Ok(Some(deployment))
    }

    /// Save the record of `contract`, creating the network directory if needed.
    pub fn save(&self, contract: &str, deployment: &StoredDeployment) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        std::fs::write(self.dir.join(CHAIN_ID_FILENAME), self.chain_id.to_string())
            .context("Failed to write chain id file")?;

        let path = self.path_for(contract);
        let json = serde_json::to_string_pretty(deployment)
            .context("Failed to serialize deployment record")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Deployment saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn sample() -> StoredDeployment {
        StoredDeployment {
            address: Address::repeat_byte(0x11),
            transaction_hash: B256::repeat_byte(0x22),
            deployer: Address::repeat_byte(0x33),
            block_number: 7,
            gas_used: 1_234_567,
            args: Bytes::new(),
            code_hash: code_hash(&[0x60, 0x80]),
            deployed_at: 1737316800,
            tool_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn test_code_hash_determinism() {
        let hash1 = code_hash(&[0x60, 0x80]);
        let hash2 = code_hash(&[0x60, 0x80]);

        assert_eq!(hash1, hash2, "Hash should be deterministic");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_ne!(hash1, code_hash(&[0x60, 0x81]), "Hash should change with the code");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new("tictactoe-test").expect("Failed to create temp dir");
        let store = DeploymentStore::new(temp_dir.path(), "goerli", 5);

        let original = sample();
        store.save("TicTacToe", &original).expect("Failed to save deployment");

        let loaded = store.load("TicTacToe").expect("Failed to load deployment");
        assert_eq!(loaded, Some(original));
        assert!(temp_dir.path().join("goerli/.chainId").exists());
    }

    #[test]
    fn test_load_missing_record() {
        let temp_dir = TempDir::new("tictactoe-test").expect("Failed to create temp dir");
        let store = DeploymentStore::new(temp_dir.path(), "goerli", 5);
        assert_eq!(store.load("TicTacToe").unwrap(), None);
    }

    #[test]
    fn test_records_of_another_chain_are_ignored() {
        let temp_dir = TempDir::new("tictactoe-test").expect("Failed to create temp dir");
        DeploymentStore::new(temp_dir.path(), "localhost", 31337)
            .save("TicTacToe", &sample())
            .unwrap();

        let store = DeploymentStore::new(temp_dir.path(), "localhost", 1337);
        assert_eq!(store.load("TicTacToe").unwrap(), None);
    }

    #[test]
    fn test_load_corrupted_record() {
        let temp_dir = TempDir::new("tictactoe-test").expect("Failed to create temp dir");
        let store = DeploymentStore::new(temp_dir.path(), "goerli", 5);
        store.save("TicTacToe", &sample()).unwrap();

        std::fs::write(store.dir().join("TicTacToe.json"), "{ invalid json }")
            .expect("Failed to write corrupted file");

        assert!(store.load("TicTacToe").is_err());
    }
}
