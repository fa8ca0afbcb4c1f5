//! The contract kinds this project knows how to deploy.

use serde::{Deserialize, Serialize};

/// A deployable contract kind.
///
/// Every kind goes through the same deployment path; the kind only decides
/// which compiled artifact is loaded and how constructor arguments are labelled
/// in the progress log.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ContractKind {
    /// The SGX ERC20 token.
    Token,
    /// The lockup contract holding locked rewards.
    Lockup,
    /// The gSGX governance wrapper around the token.
    Governance,
    /// The vault factory.
    VaultFactory,
    /// The zapper, swapping into SGX and depositing in one transaction.
    Zapper,
}

impl ContractKind {
    /// Name of the compiled artifact (contract name in the Solidity sources).
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractKind::Token => "Subgenix",
            ContractKind::Lockup => "LockupHell",
            ContractKind::Governance => "GovernanceSGX",
            ContractKind::VaultFactory => "VaultFactory",
            ContractKind::Zapper => "Zapper",
        }
    }

    /// Constructor argument names, in the order of the latest contract revision.
    pub fn constructor_arg_names(&self) -> &'static [&'static str] {
        match self {
            ContractKind::Token => &["name", "symbol", "decimals"],
            ContractKind::Lockup => &["token"],
            ContractKind::Governance => &["token"],
            ContractKind::VaultFactory => {
                &["wavax", "token", "governance", "treasury", "research", "lockup"]
            }
            ContractKind::Zapper => &["token", "vault_factory"],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_kind_roundtrips_through_kebab_case() {
        for kind in ContractKind::iter() {
            let parsed = ContractKind::from_str(&kind.to_string()).unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!(ContractKind::VaultFactory.to_string(), "vault-factory");
    }

    #[test]
    fn test_artifact_names_are_distinct() {
        let mut names: Vec<_> = ContractKind::iter().map(|k| k.artifact_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ContractKind::iter().count());
    }
}
