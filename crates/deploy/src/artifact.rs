//! Compiled contract artifacts and ABI encoding.
//!
//! Artifacts are produced by an external build (Foundry or Hardhat) and only
//! read here. Both JSON layouts are accepted: Foundry writes the creation code
//! under `bytecode.object`, Hardhat writes it directly under `bytecode`.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param},
    primitives::{Address, Bytes},
};
use anyhow::{Context, Result};
use serde::Deserialize;

/// ABI and creation bytecode of one contract.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

/// On-disk JSON layout shared by Foundry and Hardhat artifacts.
#[derive(Debug, Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: RawBytecode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// Hardhat: `"bytecode": "0x..."`
    Flat(Bytes),
    /// Foundry: `"bytecode": { "object": "0x...", ... }`
    Object { object: Bytes },
}

impl Artifact {
    pub fn new(abi: JsonAbi, bytecode: Bytes) -> Self {
        Self { abi, bytecode }
    }

    /// Parse an artifact from its JSON representation.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawArtifact =
            serde_json::from_str(content).context("Failed to parse contract artifact JSON")?;

        let bytecode = match raw.bytecode {
            RawBytecode::Flat(bytes) | RawBytecode::Object { object: bytes } => bytes,
        };

        if bytecode.is_empty() {
            anyhow::bail!("Artifact has no creation bytecode (abstract contract or interface?)");
        }

        Ok(Self::new(raw.abi, bytecode))
    }

    /// Creation code followed by the ABI-encoded constructor arguments.
    pub fn encode_deploy(&self, args: &[Literal]) -> Result<Bytes, String> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();

        let values = coerce_all(inputs, args)?;

        let mut code = self.bytecode.to_vec();
        if let Some(constructor) = &self.abi.constructor {
            let encoded = constructor
                .abi_encode_input(&values)
                .map_err(|e| e.to_string())?;
            code.extend_from_slice(&encoded);
        }

        Ok(code.into())
    }

    /// Selector followed by the ABI-encoded call arguments.
    ///
    /// When the method is overloaded, the overload whose arity matches is used.
    pub fn encode_call(&self, method: &str, args: &[Literal]) -> Result<Bytes, String> {
        let function = self.function(method, args.len())?;
        let values = coerce_all(&function.inputs, args)?;

        function
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| e.to_string())
    }

    /// Decode the return data of `method` called with `arity` arguments.
    pub fn decode_output(
        &self,
        method: &str,
        arity: usize,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, String> {
        self.function(method, arity)?
            .abi_decode_output(data)
            .map_err(|e| format!("invalid `{method}` return data: {e}"))
    }

    fn function(&self, method: &str, arity: usize) -> Result<&Function, String> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| format!("no method `{method}` taking {arity} arguments"))
    }
}

/// An argument after registry lookups, ready to be coerced to an ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Address(Address),
    Text(String),
}

fn coerce_all(params: &[Param], args: &[Literal]) -> Result<Vec<DynSolValue>, String> {
    if params.len() != args.len() {
        return Err(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        ));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| format!("unsupported parameter type `{}`: {e}", param.ty))?;
            coerce(&ty, arg).map_err(|e| format!("argument `{}`: {e}", param.name))
        })
        .collect()
}

fn coerce(ty: &DynSolType, arg: &Literal) -> Result<DynSolValue, String> {
    match (ty, arg) {
        (DynSolType::Address, Literal::Address(address)) => Ok(DynSolValue::Address(*address)),
        (_, Literal::Address(address)) => {
            Err(format!("an address ({address}) cannot be passed as `{ty}`"))
        }
        (DynSolType::String, Literal::Text(text)) => Ok(DynSolValue::String(text.clone())),
        (_, Literal::Text(text)) => ty
            .coerce_str(text)
            .map_err(|e| format!("`{text}` is not a valid `{ty}`: {e}")),
    }
}

/// Loads artifacts from a build output directory, caching them by contract name.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    root: Option<PathBuf>,
    loaded: HashMap<String, Artifact>,
}

impl ArtifactStore {
    /// Store reading from `root`, which is a Foundry `out/` or Hardhat `artifacts/` directory.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            loaded: HashMap::new(),
        }
    }

    /// Register an artifact directly.
    pub fn insert(&mut self, name: impl Into<String>, artifact: Artifact) {
        self.loaded.insert(name.into(), artifact);
    }

    /// Load every named artifact so that a missing file is reported before
    /// any transaction is sent.
    pub fn preload<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            if self.loaded.contains_key(name) {
                continue;
            }
            let artifact = self.load(name)?;
            self.loaded.insert(name.to_string(), artifact);
        }
        Ok(())
    }

    /// Artifact of the contract called `name` in the Solidity sources, if loaded.
    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.loaded.get(name)
    }

    fn load(&self, name: &str) -> Result<Artifact> {
        let root = self
            .root
            .as_ref()
            .with_context(|| format!("No artifact registered for {name}"))?;

        let path = find_artifact(root, name).with_context(|| {
            format!("Artifact {name}.json not found under {}", root.display())
        })?;

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;

        tracing::debug!(artifact = name, path = %path.display(), "Loaded contract artifact");

        Artifact::from_json(&content)
            .with_context(|| format!("Invalid artifact {}", path.display()))
    }
}

/// Locate `<name>.json` inside a `<file>.sol/` directory, searching recursively.
///
/// Foundry writes `out/<Name>.sol/<Name>.json`; Hardhat writes
/// `artifacts/contracts/<path>/<Name>.sol/<Name>.json`.
fn find_artifact(root: &Path, name: &str) -> Option<PathBuf> {
    let file_name = format!("{name}.json");
    let entries = std::fs::read_dir(root).ok()?;

    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let candidate = path.join(&file_name);
            if path.extension().is_some_and(|ext| ext == "sol") && candidate.is_file() {
                return Some(candidate);
            }
            subdirs.push(path);
        }
    }

    subdirs
        .into_iter()
        .find_map(|dir| find_artifact(&dir, name))
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{U256, address};
    use tempdir::TempDir;

    use super::*;

    fn lockup_artifact() -> Artifact {
        let abi = JsonAbi::parse([
            "constructor(address token)",
            "function setLongPercentage(uint256 value)",
            "function setLeagueAmount(uint8 league, uint256 amount)",
            "function setManager(address user, bool state)",
            "function usersVault(address user) view returns (bool exists, uint256 balance)",
        ])
        .unwrap();
        Artifact::new(abi, Bytes::from_static(&[0x60, 0x80]))
    }

    #[test]
    fn test_encode_deploy_appends_constructor_args() {
        let token = address!("0x1111111111111111111111111111111111111111");
        let code = lockup_artifact()
            .encode_deploy(&[Literal::Address(token)])
            .unwrap();

        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[..2], &[0x60, 0x80]);
        assert_eq!(&code[2 + 12..], token.as_slice());
    }

    #[test]
    fn test_encode_deploy_rejects_wrong_arity() {
        let err = lockup_artifact().encode_deploy(&[]).unwrap_err();
        assert!(err.contains("expected 1 arguments"), "unexpected error: {err}");
    }

    #[test]
    fn test_encode_call_uses_selector_and_coerces_uints() {
        let data = lockup_artifact()
            .encode_call(
                "setLeagueAmount",
                &[
                    Literal::Text("3".to_string()),
                    Literal::Text("100000000000000000000000".to_string()),
                ],
            )
            .unwrap();

        let selector = alloy_core::primitives::keccak256("setLeagueAmount(uint8,uint256)");
        assert_eq!(&data[..4], &selector[..4]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(U256::from_be_slice(&data[4..36]), U256::from(3));
        assert_eq!(
            U256::from_be_slice(&data[36..68]),
            U256::from(100_000u64) * U256::from(10u64).pow(U256::from(18))
        );
    }

    #[test]
    fn test_encode_call_rejects_address_for_uint() {
        let err = lockup_artifact()
            .encode_call("setLongPercentage", &[Literal::Address(Address::ZERO)])
            .unwrap_err();
        assert!(err.contains("cannot be passed"), "unexpected error: {err}");
    }

    #[test]
    fn test_encode_call_unknown_method() {
        let err = lockup_artifact()
            .encode_call("setShortPercentage", &[Literal::Text("1".to_string())])
            .unwrap_err();
        assert!(err.contains("no method"), "unexpected error: {err}");
    }

    #[test]
    fn test_decode_output() {
        let mut data = vec![0u8; 64];
        data[31] = 1;
        data[63] = 42;

        let values = lockup_artifact()
            .decode_output("usersVault", 1, &data)
            .unwrap();

        assert_eq!(values[0], DynSolValue::Bool(true));
        assert_eq!(values[1].as_uint(), Some((U256::from(42), 256)));
        assert!(
            lockup_artifact()
                .decode_output("usersVault", 1, &data[..32])
                .is_err()
        );
    }

    #[test]
    fn test_from_json_accepts_both_layouts() {
        let foundry = r#"{"abi":[],"bytecode":{"object":"0x6080","sourceMap":""}}"#;
        let hardhat = r#"{"abi":[],"bytecode":"0x6080"}"#;

        assert_eq!(Artifact::from_json(foundry).unwrap().bytecode.len(), 2);
        assert_eq!(Artifact::from_json(hardhat).unwrap().bytecode.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_empty_bytecode() {
        assert!(Artifact::from_json(r#"{"abi":[],"bytecode":"0x"}"#).is_err());
    }

    #[test]
    fn test_store_finds_nested_artifacts() {
        let temp_dir = TempDir::new("subgenix-artifacts").expect("Failed to create temp dir");
        let sol_dir = temp_dir.path().join("contracts/LockupHell.sol");
        std::fs::create_dir_all(&sol_dir).unwrap();
        std::fs::write(
            sol_dir.join("LockupHell.json"),
            r#"{"abi":[],"bytecode":"0x6080"}"#,
        )
        .unwrap();

        let mut store = ArtifactStore::from_dir(temp_dir.path());
        store.preload(["LockupHell"]).unwrap();

        assert!(store.get("LockupHell").is_some());
        assert!(store.preload(["Subgenix"]).is_err());
    }
}
