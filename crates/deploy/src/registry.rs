//! Run-scoped registry of deployed contracts and its on-disk form.

use std::{collections::BTreeSet, path::Path};

use alloy_core::primitives::{Address, TxHash};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::contracts::ContractKind;

/// A contract whose deployment transaction has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub name: String,
    pub kind: ContractKind,
    pub address: Address,
    /// Artifact the contract was deployed from, when it differs from the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Hash of the deployment transaction. Absent for entries added by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl DeployedContract {
    /// Name of the artifact holding the contract ABI.
    pub fn artifact_name(&self) -> &str {
        self.artifact
            .as_deref()
            .unwrap_or_else(|| self.kind.artifact_name())
    }
}

/// Append-only mapping from contract name to deployed contract, kept in
/// deployment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    contracts: Vec<DeployedContract>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contract. Fails if the name is already registered.
    pub fn insert(&mut self, contract: DeployedContract) -> Result<()> {
        if self.contains(&contract.name) {
            anyhow::bail!("Contract `{}` is already registered", contract.name);
        }
        self.contracts.push(contract);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.contracts.iter().find(|c| c.name == name)
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        self.get(name).map(|c| c.address)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Artifact names of every contract, deduplicated.
    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        let mut seen = std::collections::HashSet::new();
        self.contracts
            .iter()
            .map(DeployedContract::artifact_name)
            .filter(move |name| seen.insert(*name))
    }

    /// Contracts in the order they were deployed.
    pub fn iter(&self) -> impl Iterator<Item = &DeployedContract> {
        self.contracts.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.iter().map(|c| c.name.as_str())
    }
}

/// A registry persisted to disk, with enough metadata to resume a run.
///
/// The file is rewritten after every confirmed deployment and every applied
/// configuration call so that an interrupted run leaves an accurate record
/// behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    /// Network profile name.
    pub network: String,
    pub chain_id: u64,
    /// Fingerprint of the plan that produced the registry.
    pub plan_fingerprint: String,
    /// Unix timestamp of the last write.
    pub updated_at: i64,
    pub contracts: Registry,
    /// Fingerprint of the configuration batch `applied_calls` refers to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub batch_fingerprint: String,
    /// Indexes of the batch calls already sent. They are never sent again on resume.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub applied_calls: BTreeSet<usize>,
}

impl RegistryFile {
    pub fn new(
        network: &str,
        chain_id: u64,
        plan_fingerprint: String,
        contracts: Registry,
    ) -> Self {
        Self {
            network: network.to_string(),
            chain_id,
            plan_fingerprint,
            updated_at: chrono::Utc::now().timestamp(),
            contracts,
            batch_fingerprint: String::new(),
            applied_calls: BTreeSet::new(),
        }
    }

    /// Record configuration progress against the batch with `batch_fingerprint`.
    pub fn with_applied_calls(
        mut self,
        batch_fingerprint: String,
        applied_calls: BTreeSet<usize>,
    ) -> Self {
        self.batch_fingerprint = batch_fingerprint;
        self.applied_calls = applied_calls;
        self
    }

    /// Save the registry as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize registry")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write registry to {}", path.display()))?;

        tracing::debug!(path = %path.display(), contracts = self.contracts.len(), "Registry saved");
        Ok(())
    }

    /// Load a registry file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Registry file does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry file {}", path.display()))
    }

    /// Check that this registry can seed a run of the given plan on the given chain.
    pub fn check_resumable(
        &self,
        chain_id: u64,
        plan_fingerprint: &str,
        force: bool,
    ) -> Result<()> {
        if self.chain_id != chain_id {
            anyhow::bail!(
                "Registry was written for chain {} but the target chain is {}",
                self.chain_id,
                chain_id
            );
        }

        if self.plan_fingerprint != plan_fingerprint {
            if !force {
                anyhow::bail!(
                    "Registry was written for a different plan (fingerprint {}); pass --force to resume anyway",
                    self.plan_fingerprint
                );
            }
            tracing::warn!(
                recorded = %self.plan_fingerprint,
                current = %plan_fingerprint,
                "Resuming with a plan that differs from the recorded one"
            );
        }

        Ok(())
    }

    /// Calls of the batch with `batch_fingerprint` that a resumed run must not send again.
    ///
    /// Recorded indexes belong to the batch they were recorded against. If the
    /// batch changed they are refused, or dropped with `force`, in which case
    /// every call is sent again.
    pub fn resumable_calls(
        &self,
        batch_fingerprint: &str,
        force: bool,
    ) -> Result<BTreeSet<usize>> {
        if self.applied_calls.is_empty() || self.batch_fingerprint == batch_fingerprint {
            return Ok(self.applied_calls.clone());
        }

        if !force {
            anyhow::bail!(
                "Registry records {} applied calls of a different configuration batch; \
                 pass --force to send the whole batch again",
                self.applied_calls.len()
            );
        }

        tracing::warn!(
            recorded = %self.batch_fingerprint,
            current = %batch_fingerprint,
            dropped = ?self.applied_calls,
            "Configuration batch changed, every call will be sent again"
        );
        Ok(BTreeSet::new())
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;
    use tempdir::TempDir;

    use super::*;

    fn contract(name: &str, address: Address) -> DeployedContract {
        DeployedContract {
            name: name.to_string(),
            kind: ContractKind::Token,
            address,
            artifact: None,
            tx_hash: Some(TxHash::repeat_byte(0xab)),
            block_number: Some(7),
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = Registry::new();
        registry
            .insert(contract("sgx", address!("0x1111111111111111111111111111111111111111")))
            .unwrap();

        let result = registry.insert(contract(
            "sgx",
            address!("0x2222222222222222222222222222222222222222"),
        ));

        assert!(result.is_err(), "Duplicate insert should be rejected");
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.address("sgx"),
            Some(address!("0x1111111111111111111111111111111111111111"))
        );
    }

    #[test]
    fn test_iteration_keeps_deployment_order() {
        let mut registry = Registry::new();
        for (i, name) in ["sgx", "lockup", "gsgx"].iter().enumerate() {
            registry
                .insert(contract(name, Address::with_last_byte(i as u8 + 1)))
                .unwrap();
        }

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["sgx", "lockup", "gsgx"]);
    }

    #[test]
    fn test_registry_file_save_and_load() {
        let temp_dir = TempDir::new("subgenix-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested/deployments.json");

        let mut registry = Registry::new();
        registry
            .insert(contract("sgx", Address::with_last_byte(1)))
            .unwrap();
        let original = RegistryFile::new("fuji", 43113, "abc".to_string(), registry)
            .with_applied_calls("batch".to_string(), BTreeSet::from([0, 1, 3]));

        original.save_to_file(&path).expect("Failed to save registry");
        let loaded = RegistryFile::load_from_file(&path).expect("Failed to load registry");

        assert_eq!(original, loaded, "Loaded registry should match original");
    }

    #[test]
    fn test_registry_file_load_missing() {
        let temp_dir = TempDir::new("subgenix-test").expect("Failed to create temp dir");
        let result = RegistryFile::load_from_file(&temp_dir.path().join("missing.json"));
        assert!(result.is_err(), "Loading missing file should return error");
    }

    #[test]
    fn test_check_resumable() {
        let file = RegistryFile::new("fuji", 43113, "abc".to_string(), Registry::new());

        assert!(file.check_resumable(43113, "abc", false).is_ok());
        assert!(file.check_resumable(43114, "abc", false).is_err());
        assert!(file.check_resumable(43113, "def", false).is_err());
        assert!(file.check_resumable(43113, "def", true).is_ok());
        assert!(file.check_resumable(43114, "abc", true).is_err());
    }

    #[test]
    fn test_resumable_calls_follow_the_batch() {
        let file = RegistryFile::new("fuji", 43113, "abc".to_string(), Registry::new())
            .with_applied_calls("batch-1".to_string(), BTreeSet::from([0, 1]));

        assert_eq!(
            file.resumable_calls("batch-1", false).unwrap(),
            BTreeSet::from([0, 1])
        );
        assert!(file.resumable_calls("batch-2", false).is_err());
        assert!(file.resumable_calls("batch-2", true).unwrap().is_empty());

        let untouched = RegistryFile::new("fuji", 43113, "abc".to_string(), Registry::new());
        assert!(untouched.resumable_calls("batch-2", false).unwrap().is_empty());
    }

    #[test]
    fn test_registry_file_without_calls_still_loads() {
        let temp_dir = TempDir::new("subgenix-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join("deployments.json");
        std::fs::write(
            &path,
            r#"{"network":"fuji","chain_id":43113,"plan_fingerprint":"abc","updated_at":0,"contracts":[]}"#,
        )
        .unwrap();

        let loaded = RegistryFile::load_from_file(&path).expect("Failed to load registry");
        assert!(loaded.applied_calls.is_empty());
        assert!(loaded.batch_fingerprint.is_empty());
    }
}
