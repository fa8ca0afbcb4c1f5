//! Built-in plans for the Subgenix protocol.

use std::{path::PathBuf, str::FromStr};

use alloy_core::primitives::{Address, address};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    contracts::ContractKind,
    plan::{Arg, ConfigCall, ConfigurationBatch, ContractSpec, DeploymentPlan, PlanFile},
};

/// Treasury used by the testnet deployment when none is configured.
pub const TESTNET_TREASURY: Address = address!("0x11C0402CA8326a118A28abA79E8ddBCC69b3C910");

/// External addresses the presets wire into the contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasury: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<Address>,
    /// Wrapped AVAX, the token accepted by the vaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavax: Option<Address>,
}

/// Built-in plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PlanPreset {
    Mainnet,
    Testnet,
}

impl PlanPreset {
    pub fn build(&self, params: &PlanParams) -> Result<PlanFile> {
        match self {
            PlanPreset::Mainnet => mainnet(params),
            PlanPreset::Testnet => Ok(testnet(params)),
        }
    }
}

/// Where a plan comes from: a preset name or a TOML plan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    Preset(PlanPreset),
    File(PathBuf),
}

impl FromStr for PlanSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match PlanPreset::from_str(s) {
            Ok(preset) => PlanSource::Preset(preset),
            Err(_) => PlanSource::File(PathBuf::from(s)),
        })
    }
}

impl std::fmt::Display for PlanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanSource::Preset(preset) => write!(f, "{preset}"),
            PlanSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl PlanSource {
    pub fn load(&self, params: &PlanParams) -> Result<PlanFile> {
        match self {
            PlanSource::Preset(preset) => preset.build(params),
            PlanSource::File(path) => PlanFile::load(path),
        }
    }
}

fn required(value: Option<Address>, key: &str) -> Result<Address> {
    value.with_context(|| {
        format!(
            "The mainnet plan needs `params.{key}` (set it in Subgenix.toml or SUBGENIX_PARAMS__{})",
            key.to_uppercase()
        )
    })
}

/// Production deployment on Avalanche C-Chain.
pub fn mainnet(params: &PlanParams) -> Result<PlanFile> {
    let wavax = required(params.wavax, "wavax")?;
    let treasury = required(params.treasury, "treasury")?;
    let research = required(params.research, "research")?;

    let contracts = DeploymentPlan::new(vec![
        ContractSpec::new(
            "sgx",
            ContractKind::Token,
            vec![
                Arg::value("Subgenix Token"),
                Arg::value("SGX"),
                Arg::value(18),
            ],
        ),
        ContractSpec::new("lockup", ContractKind::Lockup, vec![Arg::reference("sgx")]),
        ContractSpec::new("gsgx", ContractKind::Governance, vec![Arg::reference("sgx")]),
        ContractSpec::new(
            "vault",
            ContractKind::VaultFactory,
            vec![
                Arg::value(wavax),
                Arg::reference("sgx"),
                Arg::reference("gsgx"),
                Arg::value(treasury),
                Arg::value(research),
                Arg::reference("lockup"),
            ],
        ),
    ]);

    let mut calls = vec![
        ConfigCall::required("lockup", "setLongPercentage", vec![Arg::percent(18)])
            .with_label("set long percentage"),
        ConfigCall::required("lockup", "setShortPercentage", vec![Arg::percent(12)])
            .with_label("set short percentage"),
        ConfigCall::required("gsgx", "setWithdrawCeil", vec![Arg::ether(10_000)])
            .with_label("set gSGX withdraw ceil"),
        ConfigCall::required("lockup", "setVaultFactory", vec![Arg::reference("vault")])
            .with_label("set vault factory"),
        ConfigCall::required("vault", "setInterestRate", vec![Arg::ether(7)])
            .with_label("set interest rate"),
        ConfigCall::required("vault", "setBurnPercent", vec![Arg::percent(2)])
            .with_label("set burn percent"),
        ConfigCall::required("vault", "setgSGXPercent", vec![Arg::percent(13)])
            .with_label("set gSGX percent"),
        ConfigCall::required("vault", "setgSGXDistributed", vec![Arg::percent(5)])
            .with_label("set gSGX distributed"),
        ConfigCall::required("vault", "setMinVaultDeposit", vec![Arg::ether(500)])
            .with_label("set min vault deposit"),
        ConfigCall::required("vault", "setNetworkBoost", vec![Arg::units(16, 17)])
            .with_label("set network boost"),
        ConfigCall::required("vault", "setLiquidateVaultPercent", vec![Arg::percent(15)])
            .with_label("set liquidate vault percent"),
        ConfigCall::required("vault", "setRewardsWaitTime", vec![Arg::value(86_400)])
            .with_label("set rewards wait time"),
        ConfigCall::fire_and_forget("vault", "setDepositSwapPercentage", vec![Arg::percent(33)])
            .with_label("set deposit swap percentage"),
        ConfigCall::fire_and_forget("vault", "setCreateSwapPercentage", vec![Arg::percent(66)])
            .with_label("set create swap percentage"),
    ];

    for (league, amount) in [2_000, 5_000, 20_000, 100_000].into_iter().enumerate() {
        calls.push(
            ConfigCall::required(
                "vault",
                "setLeagueAmount",
                vec![Arg::value(league), Arg::ether(amount)],
            )
            .with_label(format!("set league {league} amount")),
        );
    }

    calls.extend([
        ConfigCall::required(
            "sgx",
            "setManager",
            vec![Arg::reference("vault"), Arg::value(true)],
        )
        .with_label("set token manager"),
        ConfigCall::required(
            "vault",
            "setAcceptedTokens",
            vec![Arg::value(wavax), Arg::value(true)],
        )
        .with_label("add accepted token"),
    ]);

    Ok(PlanFile {
        contracts,
        calls: ConfigurationBatch::new(calls),
    })
}

/// Fuji deployment, built against the testnet revision of the contracts.
pub fn testnet(params: &PlanParams) -> PlanFile {
    let treasury = params.treasury.unwrap_or(TESTNET_TREASURY);

    let contracts = DeploymentPlan::new(vec![
        ContractSpec::new(
            "sgx",
            ContractKind::Token,
            vec![
                Arg::value("Subgenix Currency"),
                Arg::value("SGX"),
                Arg::value(18),
            ],
        ),
        ContractSpec::new("lockup", ContractKind::Lockup, vec![Arg::reference("sgx")])
            .with_artifact("LockUpHell"),
        ContractSpec::new("gsgx", ContractKind::Governance, vec![Arg::reference("sgx")])
            .with_artifact("gSGX"),
        ContractSpec::new(
            "vault",
            ContractKind::VaultFactory,
            vec![
                Arg::reference("sgx"),
                Arg::reference("gsgx"),
                Arg::value(treasury),
                Arg::reference("lockup"),
            ],
        ),
        ContractSpec::new(
            "zapper",
            ContractKind::Zapper,
            vec![Arg::reference("sgx"), Arg::reference("vault")],
        ),
    ]);

    let calls = vec![
        ConfigCall::required("lockup", "setLongPercentage", vec![Arg::value(1_800)])
            .with_label("set long percentage"),
        ConfigCall::required("lockup", "setShortPercentage", vec![Arg::value(1_200)])
            .with_label("set short percentage"),
        ConfigCall::required("gsgx", "setWithdrawCeil", vec![Arg::ether(100_000)])
            .with_label("set gSGX withdraw ceil"),
        ConfigCall::required("lockup", "setLongLockupTime", vec![Arg::value(1_555_200)])
            .with_label("set long lockup time"),
        ConfigCall::required("lockup", "setShortLockupTime", vec![Arg::value(604_800)])
            .with_label("set short lockup time"),
        ConfigCall::required("lockup", "setVaultFactory", vec![Arg::reference("vault")])
            .with_label("set vault factory"),
        ConfigCall::required("vault", "setInterestRate", vec![Arg::percent(1)])
            .with_label("set interest rate"),
        ConfigCall::required("vault", "setBurnPercent", vec![Arg::value(200)])
            .with_label("set burn percent"),
        ConfigCall::required("vault", "setgSGXPercent", vec![Arg::value(1_300)])
            .with_label("set gSGX percent"),
        ConfigCall::required("vault", "setgSGXDistributed", vec![Arg::value(500)])
            .with_label("set gSGX distributed"),
        ConfigCall::required("vault", "setMinVaultDeposit", vec![Arg::ether(1)])
            .with_label("set min vault deposit"),
        ConfigCall::required(
            "sgx",
            "setManager",
            vec![Arg::reference("vault"), Arg::value(true)],
        )
        .with_label("set vault as token manager"),
        ConfigCall::required("sgx", "setManager", vec![Arg::Signer, Arg::value(true)])
            .with_label("set signer as token manager"),
        ConfigCall::required("sgx", "mint", vec![Arg::Signer, Arg::ether(10_000)])
            .with_label("mint signer tokens"),
    ];

    PlanFile {
        contracts,
        calls: ConfigurationBatch::new(calls),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn mainnet_params() -> PlanParams {
        PlanParams {
            treasury: Some(Address::with_last_byte(1)),
            research: Some(Address::with_last_byte(2)),
            wavax: Some(Address::with_last_byte(3)),
        }
    }

    #[test]
    fn test_presets_are_valid() {
        let mainnet = PlanPreset::Mainnet.build(&mainnet_params()).unwrap();
        let testnet = PlanPreset::Testnet.build(&PlanParams::default()).unwrap();

        assert!(mainnet.validate(&HashSet::new()).is_ok());
        assert!(testnet.validate(&HashSet::new()).is_ok());
        assert_eq!(
            mainnet.contracts.names().collect::<Vec<_>>(),
            ["sgx", "lockup", "gsgx", "vault"]
        );
        assert_eq!(testnet.contracts.len(), 5);
    }

    #[test]
    fn test_mainnet_requires_external_addresses() {
        let params = PlanParams {
            wavax: None,
            ..mainnet_params()
        };

        let err = PlanPreset::Mainnet.build(&params).unwrap_err();
        assert!(err.to_string().contains("params.wavax"), "unexpected error: {err}");
    }

    #[test]
    fn test_mainnet_swap_percentages_are_not_awaited() {
        let plan = mainnet(&mainnet_params()).unwrap();

        let optional: Vec<_> = plan
            .calls
            .iter()
            .filter(|call| !call.required)
            .map(|call| call.method.as_str())
            .collect();
        assert_eq!(optional, ["setDepositSwapPercentage", "setCreateSwapPercentage"]);
    }

    #[test]
    fn test_testnet_uses_default_treasury() {
        let plan = testnet(&PlanParams::default());
        assert_eq!(plan.contracts[3].args[2], Arg::value(TESTNET_TREASURY));
        assert_eq!(plan.contracts[1].artifact_name(), "LockUpHell");
    }

    #[test]
    fn test_plan_source_parsing() {
        assert_eq!(
            PlanSource::from_str("testnet").unwrap(),
            PlanSource::Preset(PlanPreset::Testnet)
        );
        assert_eq!(
            PlanSource::from_str("plans/custom.toml").unwrap(),
            PlanSource::File(PathBuf::from("plans/custom.toml"))
        );
    }
}
