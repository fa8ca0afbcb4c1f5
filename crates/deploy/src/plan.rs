//! Deployment plans and configuration batches.
//!
//! A [`DeploymentPlan`] is an ordered list of contracts to deploy, where the
//! order is also the dependency order: an entry may only reference contracts
//! that appear before it. A [`ConfigurationBatch`] is the ordered list of
//! state-setting calls applied once every contract is deployed.

use std::{collections::HashSet, fmt, path::Path};

use anyhow::{Context, Result};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{contracts::ContractKind, error::StepError};

/// A single argument to a constructor or a configuration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    /// Address of a contract deployed earlier in the run.
    Ref(String),
    /// Address of the account signing the transactions.
    Signer,
    /// A literal, coerced to the ABI type of the parameter it is passed as.
    Value(String),
    /// A decimal amount scaled by `10^decimals`.
    Units { amount: String, decimals: u8 },
}

impl Arg {
    /// Reference to a deployed contract.
    pub fn reference(name: impl Into<String>) -> Self {
        Arg::Ref(name.into())
    }

    /// Literal value.
    pub fn value(literal: impl ToString) -> Self {
        Arg::Value(literal.to_string())
    }

    /// `amount * 10^decimals`.
    pub fn units(amount: impl ToString, decimals: u8) -> Self {
        Arg::Units {
            amount: amount.to_string(),
            decimals,
        }
    }

    /// `amount * 10^16`, the on-chain representation of `amount` percent.
    pub fn percent(amount: impl ToString) -> Self {
        Self::units(amount, 16)
    }

    /// `amount * 10^18`, i.e. whole tokens.
    pub fn ether(amount: impl ToString) -> Self {
        Self::units(amount, 18)
    }

    /// The registry name this argument depends on, if any.
    pub fn dependency(&self) -> Option<&str> {
        match self {
            Arg::Ref(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Ref(name) => write!(f, "@{name}"),
            Arg::Signer => write!(f, "@signer"),
            Arg::Value(literal) => write!(f, "{literal}"),
            Arg::Units { amount, decimals } => write!(f, "{amount}e{decimals}"),
        }
    }
}

/// A contract to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Registry name of the contract, unique within a plan.
    pub name: String,
    /// What kind of contract this is.
    pub kind: ContractKind,
    /// Constructor arguments, in order.
    #[serde(default)]
    pub args: Vec<Arg>,
    /// Artifact to deploy when the contract name in the sources differs from
    /// the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl ContractSpec {
    pub fn new(name: impl Into<String>, kind: ContractKind, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            kind,
            args,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Name of the compiled artifact to deploy.
    pub fn artifact_name(&self) -> &str {
        self.artifact
            .as_deref()
            .unwrap_or_else(|| self.kind.artifact_name())
    }

    /// Constructor arguments paired with a display label.
    ///
    /// Uses the kind's parameter names when the argument count matches them
    /// (a build with another constructor falls back to positions).
    pub fn labelled_args(&self) -> impl Iterator<Item = (String, &Arg)> {
        let names = self.kind.constructor_arg_names();
        let named = names.len() == self.args.len();
        self.args.iter().enumerate().map(move |(i, arg)| {
            let label = if named {
                names[i].to_string()
            } else {
                format!("arg{i}")
            };
            (label, arg)
        })
    }
}

/// An ordered, dependency-respecting list of contracts to deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref)]
#[serde(transparent)]
pub struct DeploymentPlan(Vec<ContractSpec>);

impl DeploymentPlan {
    pub fn new(contracts: Vec<ContractSpec>) -> Self {
        Self(contracts)
    }

    /// Check that names are unique and every reference points backwards.
    ///
    /// `known` holds names already available before the plan starts (a
    /// registry being resumed), which any entry may reference.
    pub fn validate(&self, known: &HashSet<String>) -> Result<(), (usize, StepError)> {
        let mut seen: HashSet<&str> = known.iter().map(String::as_str).collect();
        let mut names: HashSet<&str> = HashSet::new();

        for (index, spec) in self.iter().enumerate() {
            if !names.insert(&spec.name) {
                return Err((
                    index,
                    StepError::InvalidEntry {
                        entry: spec.name.clone(),
                        reason: "duplicate contract name".to_string(),
                    },
                ));
            }

            if let Some(missing) = spec
                .args
                .iter()
                .filter_map(Arg::dependency)
                .find(|dep| !seen.contains(dep))
            {
                return Err((
                    index,
                    StepError::DependencyUnresolved {
                        entry: spec.name.clone(),
                        missing: missing.to_string(),
                    },
                ));
            }

            seen.insert(&spec.name);
        }

        Ok(())
    }

    /// Artifact names used by the plan, deduplicated.
    pub fn artifact_names(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.iter()
            .map(ContractSpec::artifact_name)
            .filter(move |name| seen.insert(*name))
    }

    /// Names of every entry, in plan order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|spec| spec.name.as_str())
    }

    /// Hex-encoded SHA-256 of the plan, used to detect plan drift on resumption.
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }
}

fn fingerprint(value: &impl Serialize) -> String {
    let json = serde_json::to_string(value).expect("Plan serialization should never fail");

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// A post-deployment transaction setting state on a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCall {
    /// Short description used in the progress log.
    #[serde(default)]
    pub label: String,
    /// Registry name of the contract to call.
    pub target: String,
    /// Method name in the contract ABI.
    pub method: String,
    /// Call arguments, in order.
    #[serde(default)]
    pub args: Vec<Arg>,
    /// Wait for the transaction to be confirmed before moving on.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ConfigCall {
    /// A call that must be confirmed before the next one is sent.
    pub fn required(target: impl Into<String>, method: impl Into<String>, args: Vec<Arg>) -> Self {
        let method = method.into();
        Self {
            label: method.clone(),
            target: target.into(),
            method,
            args,
            required: true,
        }
    }

    /// A call that is submitted without waiting for its confirmation.
    pub fn fire_and_forget(
        target: impl Into<String>,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(target, method, args)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The label, falling back to the method name.
    pub fn describe(&self) -> &str {
        if self.label.is_empty() {
            &self.method
        } else {
            &self.label
        }
    }

    /// `target.method` for logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.target, self.method)
    }
}

/// An ordered list of configuration calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref)]
#[serde(transparent)]
pub struct ConfigurationBatch(Vec<ConfigCall>);

impl ConfigurationBatch {
    pub fn new(calls: Vec<ConfigCall>) -> Self {
        Self(calls)
    }

    /// Hex-encoded SHA-256 of the batch. Recorded call indexes are only
    /// meaningful for the batch they were recorded against.
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }

    /// Check every target and reference against the names a plan will produce.
    pub fn validate(&self, available: &HashSet<String>) -> Result<(), (usize, StepError)> {
        for (index, call) in self.iter().enumerate() {
            let missing = std::iter::once(call.target.as_str())
                .chain(call.args.iter().filter_map(Arg::dependency))
                .find(|name| !available.contains(*name));

            if let Some(missing) = missing {
                return Err((
                    index,
                    StepError::DependencyUnresolved {
                        entry: call.qualified_name(),
                        missing: missing.to_string(),
                    },
                ));
            }
        }

        Ok(())
    }
}

/// A plan and its batch, as stored in a TOML plan file.
///
/// ```toml
/// [[contracts]]
/// name = "sgx"
/// kind = "token"
/// args = [{ value = "Subgenix Token" }, { value = "SGX" }, { value = "18" }]
///
/// [[contracts]]
/// name = "lockup"
/// kind = "lockup"
/// args = [{ ref = "sgx" }]
///
/// [[calls]]
/// target = "lockup"
/// method = "setLongPercentage"
/// args = [{ units = { amount = "18", decimals = 16 } }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub contracts: DeploymentPlan,
    #[serde(default)]
    pub calls: ConfigurationBatch,
}

impl PlanFile {
    /// Load a plan file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse plan file {}", path.display()))
    }

    /// Validate the plan, then the batch against the names the plan produces.
    pub fn validate(&self, known: &HashSet<String>) -> Result<(), (usize, StepError)> {
        self.contracts.validate(known)?;

        let mut available = known.clone();
        available.extend(self.contracts.names().map(String::from));
        self.calls.validate(&available)
    }
}
