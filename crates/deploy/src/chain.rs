//! The network seam the orchestrator drives.
//!
//! [`Chain`] is deliberately small: submit a transaction, look up its
//! receipt, and perform a read-only call. [`RpcChain`] implements it over
//! HTTP JSON-RPC with a local signing key.

use std::future::Future;

use alloy_core::primitives::{Address, Bytes, TxHash, U256};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    network::{GasPrice, NetworkConfig},
    rpc::{self, RpcError},
    tx::LegacyTx,
};

/// Gas limit margin applied on top of the node's estimate, in percent.
const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

/// A transaction to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// `None` deploys `data` as creation code.
    pub to: Option<Address>,
    pub data: Bytes,
}

impl TxRequest {
    pub fn create(code: Bytes) -> Self {
        Self {
            to: None,
            data: code,
        }
    }

    pub fn call(to: Address, data: Bytes) -> Self {
        Self { to: Some(to), data }
    }
}

/// The parts of a transaction receipt the orchestrator cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// `false` if the transaction reverted.
    pub success: bool,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

/// Why a submission did not produce a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The transaction was refused before reaching the mempool.
    #[error("{0}")]
    Rejected(String),
    /// The signed transaction was sent but the node's answer was lost.
    #[error("outcome of {tx_hash} unknown: {reason}")]
    Unknown { tx_hash: TxHash, reason: String },
}

/// A network the orchestrator can deploy to.
pub trait Chain: Send + Sync {
    /// Address transactions are sent from.
    fn sender(&self) -> Address;

    /// Sign and broadcast a transaction, returning its hash once the node accepted it.
    ///
    /// Never retried: a lost response may hide an accepted transaction.
    fn submit(&self, tx: TxRequest) -> impl Future<Output = Result<TxHash, SubmitError>> + Send;

    /// Receipt of a mined transaction, `None` while it is pending.
    fn receipt(&self, hash: TxHash) -> impl Future<Output = Result<Option<TxReceipt>>> + Send;

    /// Execute a read-only call against the latest block.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    status: Option<String>,
    contract_address: Option<Address>,
    block_number: Option<String>,
}

impl From<RpcReceipt> for TxReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            // Pre-Byzantium receipts have no status field.
            success: receipt.status.as_deref().is_none_or(|s| s == "0x1"),
            contract_address: receipt.contract_address,
            block_number: receipt
                .block_number
                .as_deref()
                .and_then(|n| rpc::parse_quantity(n).ok()),
        }
    }
}

/// [`Chain`] over HTTP JSON-RPC, signing locally.
pub struct RpcChain {
    client: reqwest::Client,
    url: String,
    chain_id: u64,
    gas_price: GasPrice,
    /// `None` for a read-only connection.
    signer: Option<PrivateKeySigner>,
}

impl RpcChain {
    /// Connect to the network, checking that the endpoint serves the configured chain.
    ///
    /// Without a private key the connection can only read.
    pub async fn connect(network: &NetworkConfig, private_key: Option<&str>) -> Result<Self> {
        let signer = private_key
            .map(|key| key.trim().parse::<PrivateKeySigner>())
            .transpose()
            .context("Invalid deployer private key")?;

        let client = rpc::create_client(network.request_timeout())?;
        let url = network.rpc_url.to_string();

        let chain_id: String = rpc::json_rpc_read(&client, &url, "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach RPC endpoint {url}"))?;
        let chain_id = rpc::parse_quantity(&chain_id).context("Invalid eth_chainId response")?;

        if chain_id != network.chain_id {
            anyhow::bail!(
                "RPC endpoint {} serves chain {} but network `{}` expects chain {}",
                url,
                chain_id,
                network.name,
                network.chain_id
            );
        }

        tracing::info!(
            network = %network.name,
            chain_id,
            rpc_url = %url,
            sender = ?signer.as_ref().map(PrivateKeySigner::address),
            "Connected to network"
        );

        Ok(Self {
            client,
            url,
            chain_id,
            gas_price: network.gas_price,
            signer,
        })
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        rpc::json_rpc_read(&self.client, &self.url, method, params).await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        match self.gas_price {
            GasPrice::Fixed { wei } => Ok(u128::from(wei)),
            GasPrice::Node => {
                let price: U256 = self.read("eth_gasPrice", vec![]).await?;
                Ok(price.saturating_to())
            }
        }
    }

    async fn prepare(&self, from: Address, tx: &TxRequest) -> Result<LegacyTx, SubmitError> {
        let nonce: String = self
            .read("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await
            .map_err(rejected)?;
        let nonce = rpc::parse_quantity(&nonce).map_err(rejected)?;

        let gas_price = self.gas_price().await.map_err(rejected)?;

        let mut request = json!({ "from": from, "data": tx.data });
        if let Some(to) = tx.to {
            request["to"] = json!(to);
        }

        // The node refuses to estimate a transaction that would revert.
        let estimate: String = self
            .read("eth_estimateGas", vec![request])
            .await
            .map_err(rejected)?;
        let estimate = rpc::parse_quantity(&estimate).map_err(rejected)?;

        Ok(LegacyTx {
            chain_id: self.chain_id,
            nonce,
            gas_price,
            gas_limit: estimate + estimate * GAS_LIMIT_MARGIN_PERCENT / 100,
            to: tx.to,
            value: U256::ZERO,
            input: tx.data.clone(),
        })
    }
}

/// Nothing was sent: the transaction failed while being prepared.
fn rejected(e: impl std::fmt::Display) -> SubmitError {
    SubmitError::Rejected(e.to_string())
}

impl Chain for RpcChain {
    fn sender(&self) -> Address {
        self.signer
            .as_ref()
            .map_or(Address::ZERO, PrivateKeySigner::address)
    }

    async fn submit(&self, tx: TxRequest) -> Result<TxHash, SubmitError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| SubmitError::Rejected("no private key configured".to_string()))?;

        let legacy = self.prepare(signer.address(), &tx).await?;
        let signed = legacy
            .sign(signer)
            .map_err(|e| SubmitError::Rejected(format!("signing failed: {e}")))?;

        tracing::debug!(
            nonce = legacy.nonce,
            gas_limit = legacy.gas_limit,
            gas_price = legacy.gas_price,
            tx_hash = %signed.hash,
            "Broadcasting transaction"
        );

        let hash: TxHash = rpc::json_rpc_call(
            &self.client,
            &self.url,
            "eth_sendRawTransaction",
            vec![json!(signed.raw)],
        )
        .await
        .map_err(|e| match e {
            RpcError::Node { .. } => SubmitError::Rejected(e.to_string()),
            _ => SubmitError::Unknown {
                tx_hash: signed.hash,
                reason: e.to_string(),
            },
        })?;

        if hash != signed.hash {
            tracing::warn!(local = %signed.hash, node = %hash, "Node returned an unexpected transaction hash");
        }

        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .read("eth_getTransactionReceipt", vec![json!(hash)])
            .await
            .context("Failed to fetch transaction receipt")?;
        Ok(receipt.map(TxReceipt::from))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.read("eth_call", vec![json!({ "to": to, "data": data }), json!("latest")])
            .await
            .with_context(|| format!("eth_call to {to} failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_conversion() {
        let receipt: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x0",
            "contractAddress": null,
            "blockNumber": "0x10",
            "gasUsed": "0x5208"
        }))
        .unwrap();

        let receipt = TxReceipt::from(receipt);
        assert!(!receipt.success);
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.block_number, Some(16));
    }

    #[test]
    fn test_receipt_without_status_counts_as_success() {
        let receipt: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "contractAddress": "0x2222222222222222222222222222222222222222",
            "blockNumber": "0x1"
        }))
        .unwrap();

        let receipt = TxReceipt::from(receipt);
        assert!(receipt.success);
        assert_eq!(
            receipt.contract_address,
            Some(Address::repeat_byte(0x22))
        );
    }
}
