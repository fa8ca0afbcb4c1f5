//! Read-only queries against a deployed protocol.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    artifact::{ArtifactStore, Literal},
    chain::Chain,
    registry::Registry,
};

/// Token balances below this amount (0.01 SGX) count as no dominance.
const DOMINANCE_DUST: u64 = 10_000_000_000_000_000;

const WAD: u64 = 1_000_000_000_000_000_000;

/// Share of the token supply locked in the governance contract, in percent
/// with two decimals.
pub fn governance_dominance(locked: U256, supply: U256) -> f64 {
    if locked < U256::from(DOMINANCE_DUST) || supply.is_zero() {
        return 0.0;
    }

    let basis_points: u64 = (locked * U256::from(10_000u64) / supply).saturating_to();
    basis_points as f64 / 100.0
}

/// Yearly interest rate of the vaults, as an integer percent.
///
/// `InterestRate()` is stored with 18 decimals, `1e18` being 100%.
pub fn vault_apr(interest_rate: U256) -> U256 {
    interest_rate * U256::from(100u64) / U256::from(WAD)
}

/// A user's vault, as returned by `usersVault(address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultInfo {
    pub exists: bool,
    pub last_claim_time: U256,
    pub uncollected_rewards: U256,
    pub balance: U256,
    pub interest_length: U256,
    pub league: U256,
}

impl VaultInfo {
    fn from_values(values: &[DynSolValue]) -> Result<Self> {
        let [exists, last_claim_time, uncollected_rewards, balance, interest_length, league] =
            values
        else {
            anyhow::bail!("usersVault returned {} values, expected 6", values.len());
        };

        let uint = |value: &DynSolValue, field: &str| {
            value
                .as_uint()
                .map(|(n, _)| n)
                .with_context(|| format!("usersVault field `{field}` is not an integer"))
        };

        Ok(Self {
            exists: exists
                .as_bool()
                .context("usersVault field `exists` is not a bool")?,
            last_claim_time: uint(last_claim_time, "last_claim_time")?,
            uncollected_rewards: uint(uncollected_rewards, "uncollected_rewards")?,
            balance: uint(balance, "balance")?,
            interest_length: uint(interest_length, "interest_length")?,
            league: uint(league, "league")?,
        })
    }
}

/// Runs read-only calls against the contracts of a registry.
pub struct Queries<'a, C> {
    chain: &'a C,
    artifacts: &'a ArtifactStore,
    registry: &'a Registry,
}

impl<'a, C: Chain> Queries<'a, C> {
    pub fn new(chain: &'a C, artifacts: &'a ArtifactStore, registry: &'a Registry) -> Self {
        Self {
            chain,
            artifacts,
            registry,
        }
    }

    async fn read(
        &self,
        contract: &str,
        method: &str,
        args: &[Literal],
    ) -> Result<Vec<DynSolValue>> {
        let deployed = self
            .registry
            .get(contract)
            .with_context(|| format!("Contract `{contract}` is not in the registry"))?;
        let artifact = self
            .artifacts
            .get(deployed.artifact_name())
            .with_context(|| format!("Artifact `{}` is not loaded", deployed.artifact_name()))?;

        let data = artifact
            .encode_call(method, args)
            .map_err(anyhow::Error::msg)?;
        let output = self.chain.call(deployed.address, data).await?;

        artifact
            .decode_output(method, args.len(), &output)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to decode {contract}.{method}"))
    }

    async fn read_uint(&self, contract: &str, method: &str, args: &[Literal]) -> Result<U256> {
        self.read(contract, method, args)
            .await?
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(n, _)| n)
            .with_context(|| format!("{contract}.{method} did not return an integer"))
    }

    /// Dominance of `governance` over the supply of `token`.
    pub async fn governance_dominance(&self, token: &str, governance: &str) -> Result<f64> {
        let governance_address = self
            .registry
            .address(governance)
            .with_context(|| format!("Contract `{governance}` is not in the registry"))?;

        let locked = self
            .read_uint(token, "balanceOf", &[Literal::Address(governance_address)])
            .await?;
        let supply = self.read_uint(token, "totalSupply", &[]).await?;

        tracing::debug!(%locked, %supply, "Read governance balances");
        Ok(governance_dominance(locked, supply))
    }

    pub async fn vault_apr(&self, vault: &str) -> Result<U256> {
        let rate = self.read_uint(vault, "InterestRate", &[]).await?;
        Ok(vault_apr(rate))
    }

    pub async fn vault_info(&self, vault: &str, user: Address) -> Result<VaultInfo> {
        let values = self
            .read(vault, "usersVault", &[Literal::Address(user)])
            .await?;
        VaultInfo::from_values(&values)
    }
}
