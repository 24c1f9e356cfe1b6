//! Compiled contract artifacts (Hardhat layout).
//!
//! `artifacts/contracts/<File>.sol/<Name>.json` holds the bytecode, and its sibling
//! `<Name>.dbg.json` points at the build-info file with the compiler input used
//! for explorer verification.

use std::path::{Path, PathBuf};

use alloy_core::{dyn_abi::DynSolValue, primitives::Bytes};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Directory name of Hardhat build-info files, skipped when searching artifacts.
const BUILD_INFO_DIR: &str = "build-info";

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    pub source_name: String,
    #[serde(default)]
    pub abi: Value,
    /// Creation bytecode.
    #[serde(deserialize_with = "deserialize_bytecode")]
    pub bytecode: Bytes,
    /// Runtime bytecode.
    #[serde(default, deserialize_with = "deserialize_bytecode")]
    pub deployed_bytecode: Bytes,
    /// Where the artifact was read from.
    #[serde(skip)]
    pub path: PathBuf,
}

/// Compiler input and version of a build, as needed for verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: Value,
}

#[derive(Deserialize)]
struct DebugFile {
    #[serde(rename = "buildInfo")]
    build_info: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeRepr {
    Hex(String),
    Object { object: String },
}

/// Accept both `"0x..."` and `{ "object": "0x..." }` bytecode forms.
fn deserialize_bytecode<'de, D>(deserializer: D) -> std::result::Result<Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let hex_code = match BytecodeRepr::deserialize(deserializer)? {
        BytecodeRepr::Hex(code) => code,
        BytecodeRepr::Object { object } => object,
    };

    if hex_code.contains("__$") {
        return Err(serde::de::Error::custom(
            "bytecode has unlinked library placeholders",
        ));
    }

    hex::decode(hex_code.trim_start_matches("0x"))
        .map(Bytes::from)
        .map_err(serde::de::Error::custom)
}

/// ABI-encode constructor arguments. No arguments encode to nothing.
pub fn encode_constructor_args(args: &[DynSolValue]) -> Bytes {
    if args.is_empty() {
        return Bytes::new();
    }

    DynSolValue::Tuple(args.to_vec()).abi_encode_params().into()
}

impl ContractArtifact {
    /// Read an artifact file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let mut artifact: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;
        artifact.path = path.to_path_buf();
        Ok(artifact)
    }

    /// Find and read the artifact of contract `name` under `dir`.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let file_name = format!("{name}.json");
        let path = artifact_files(dir)?
            .into_iter()
            .find(|path| path.file_name().is_some_and(|f| f == file_name.as_str()))
            .with_context(|| {
                format!(
                    "No artifact for contract {name} under {}. Compile the contracts first.",
                    dir.display()
                )
            })?;

        Self::read(&path)
    }

    /// Read every artifact under `dir`, sorted by path.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        artifact_files(dir)?
            .iter()
            .map(|path| Self::read(path))
            .collect()
    }

    /// Creation code followed by the encoded constructor arguments.
    pub fn init_code(&self, args: &[DynSolValue]) -> Bytes {
        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encode_constructor_args(args));
        code.into()
    }

    /// `<source>:<name>`, the fully qualified name explorers expect.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Load the build-info referenced by the sibling `.dbg.json` file.
    pub fn build_info(&self) -> Result<BuildInfo> {
        let dbg_path = self.path.with_extension("dbg.json");
        let content = std::fs::read_to_string(&dbg_path)
            .with_context(|| format!("Failed to read {}", dbg_path.display()))?;
        let dbg: DebugFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", dbg_path.display()))?;

        let parent = dbg_path
            .parent()
            .context("Artifact path must have a parent directory")?;
        let build_info_path = parent.join(dbg.build_info);

        let content = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read {}", build_info_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", build_info_path.display()))
    }
}

/// Collect artifact files under `dir`, skipping build-info and debug files.
fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Artifacts directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current)
            .with_context(|| format!("Failed to read directory {}", current.display()))?;

        for entry in entries {
            let path = entry.context("Failed to read directory entry")?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

            if path.is_dir() {
                if name != BUILD_INFO_DIR {
                    pending.push(path);
                }
            } else if name.ends_with(".json") && !name.ends_with(".dbg.json") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
