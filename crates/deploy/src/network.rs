//! Network profiles: where to deploy and how to pay for it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::rpc::DEFAULT_REQUEST_TIMEOUT;

/// Gas price used by the Avalanche profiles: 225 gwei.
pub const AVALANCHE_GAS_PRICE_WEI: u64 = 225_000_000_000;

/// Default time to wait for a transaction receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Built-in network profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum NetworkProfile {
    /// Avalanche C-Chain mainnet.
    Mainnet,
    /// Avalanche Fuji testnet.
    Fuji,
    /// A local devnet (anvil, hardhat node).
    Local,
}

impl NetworkProfile {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkProfile::Mainnet => 43114,
            NetworkProfile::Fuji => 43113,
            NetworkProfile::Local => 31337,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            NetworkProfile::Mainnet => "https://api.avax.network/ext/bc/C/rpc",
            NetworkProfile::Fuji => "https://api.avax-test.network/ext/bc/C/rpc",
            NetworkProfile::Local => "http://127.0.0.1:8545",
        }
    }

    /// Default configuration for this profile.
    pub fn config(&self) -> NetworkConfig {
        let gas_price = match self {
            NetworkProfile::Mainnet | NetworkProfile::Fuji => GasPrice::Fixed {
                wei: AVALANCHE_GAS_PRICE_WEI,
            },
            NetworkProfile::Local => GasPrice::Node,
        };

        NetworkConfig {
            name: self.to_string(),
            rpc_url: Url::parse(self.default_rpc_url()).expect("built-in RPC URLs are valid"),
            chain_id: self.chain_id(),
            gas_price,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// How the gas price of each transaction is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum GasPrice {
    /// Always pay this price.
    Fixed { wei: u64 },
    /// Ask the node (`eth_gasPrice`) before every transaction.
    Node,
}

/// Everything needed to reach and transact on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Profile name, recorded in the registry file.
    pub name: String,
    pub rpc_url: Url,
    /// Expected chain id; the endpoint must report the same one.
    pub chain_id: u64,
    pub gas_price: GasPrice,
    /// How long to wait for a receipt before declaring the outcome unknown.
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_profiles_parse_from_kebab_case() {
        assert_eq!(NetworkProfile::from_str("fuji").unwrap(), NetworkProfile::Fuji);
        assert_eq!(NetworkProfile::from_str("mainnet").unwrap(), NetworkProfile::Mainnet);
        assert!(NetworkProfile::from_str("sepolia").is_err());
    }

    #[test]
    fn test_avalanche_profiles_use_fixed_gas_price() {
        let config = NetworkProfile::Fuji.config();
        assert_eq!(config.chain_id, 43113);
        assert_eq!(
            config.gas_price,
            GasPrice::Fixed {
                wei: 225_000_000_000
            }
        );
        assert_eq!(NetworkProfile::Local.config().gas_price, GasPrice::Node);
    }

    #[test]
    fn test_gas_price_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            gas_price: GasPrice,
        }

        let fixed: Wrapper =
            toml::from_str("gas_price = { policy = \"fixed\", wei = 25000000000 }").unwrap();
        let node: Wrapper = toml::from_str("gas_price = { policy = \"node\" }").unwrap();

        assert_eq!(fixed.gas_price, GasPrice::Fixed { wei: 25_000_000_000 });
        assert_eq!(node.gas_price, GasPrice::Node);
    }
}
