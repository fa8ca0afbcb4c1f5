//! Layered settings: profile defaults, then `Subgenix.toml`, then `SUBGENIX_` variables.
//!
//! The TOML file is keyed by profile, with `[default]` applying to all of them:
//!
//! ```toml
//! [default]
//! artifacts_dir = "out"
//!
//! [fuji.network]
//! rpc_url = "https://my-fuji-node.example/ext/bc/C/rpc"
//!
//! [mainnet.params]
//! treasury = "0x..."
//! research = "0x..."
//! wavax = "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7"
//! ```
//!
//! Environment variables use `__` to separate nested keys, e.g.
//! `SUBGENIX_NETWORK__RPC_URL` or `SUBGENIX_PARAMS__TREASURY`, and override
//! the file for every profile.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
    network::{NetworkConfig, NetworkProfile},
    presets::PlanParams,
};

/// Default settings file, read from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Subgenix.toml";

/// Prefix of the environment variables merged into the settings.
pub const ENV_PREFIX: &str = "SUBGENIX_";

/// Variables under [`ENV_PREFIX`] that belong to the command line, not the settings.
const CLI_ONLY_VARS: &[&str] = &[
    "private_key",
    "verbosity",
    "profile",
    "plan",
    "config",
    "rpc_url",
];

/// Everything a run needs besides the plan and the signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub network: NetworkConfig,
    /// Directory holding the compiled artifacts (Foundry `out/` or Hardhat `artifacts/`).
    pub artifacts_dir: PathBuf,
    /// Registry file, written after every confirmed deployment.
    pub registry_path: PathBuf,
    #[serde(default)]
    pub params: PlanParams,
}

impl Settings {
    /// Built-in settings for a profile.
    pub fn defaults(profile: NetworkProfile) -> Self {
        Self {
            network: profile.config(),
            artifacts_dir: PathBuf::from("out"),
            registry_path: PathBuf::from(format!("deployments/{profile}.json")),
            params: PlanParams::default(),
        }
    }

    /// Load the settings of `profile`, merging `file` (if it exists) and the environment.
    pub fn load(profile: NetworkProfile, file: &Path) -> Result<Self> {
        let settings: Settings = Self::figment(profile, file)
            .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(CLI_ONLY_VARS).global())
            .extract()
            .with_context(|| format!("Failed to load settings for profile `{profile}`"))?;

        tracing::debug!(
            profile = %profile,
            file = %file.display(),
            rpc_url = %settings.network.rpc_url,
            chain_id = settings.network.chain_id,
            "Settings loaded"
        );

        Ok(settings)
    }

    fn figment(profile: NetworkProfile, file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::defaults(profile)))
            .merge(Toml::file(file).nested())
            .select(profile.to_string())
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::network::GasPrice;

    fn load_file(profile: NetworkProfile, file: &Path) -> Settings {
        Settings::figment(profile, file).extract().unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new("subgenix-config").expect("Failed to create temp dir");
        let settings = load_file(NetworkProfile::Fuji, &temp_dir.path().join("missing.toml"));

        assert_eq!(settings, Settings::defaults(NetworkProfile::Fuji));
        assert_eq!(settings.registry_path, PathBuf::from("deployments/fuji.json"));
    }

    #[test]
    fn test_file_overrides_selected_profile_only() {
        let temp_dir = TempDir::new("subgenix-config").expect("Failed to create temp dir");
        let path = temp_dir.path().join("Subgenix.toml");
        std::fs::write(
            &path,
            r#"
                [default]
                artifacts_dir = "artifacts"

                [local.network]
                rpc_url = "http://127.0.0.1:9545"
                confirmation_timeout_secs = 5

                [mainnet.network]
                gas_price = { policy = "node" }

                [mainnet.params]
                treasury = "0x0000000000000000000000000000000000000001"
            "#,
        )
        .unwrap();

        let local = load_file(NetworkProfile::Local, &path);
        assert_eq!(local.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(local.network.rpc_url.as_str(), "http://127.0.0.1:9545/");
        assert_eq!(local.network.confirmation_timeout_secs, 5);
        assert_eq!(local.network.chain_id, 31337);
        assert_eq!(local.params, PlanParams::default());

        let mainnet = load_file(NetworkProfile::Mainnet, &path);
        assert_eq!(mainnet.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(mainnet.network.gas_price, GasPrice::Node);
        assert_eq!(
            mainnet.network.rpc_url.as_str(),
            "https://api.avax.network/ext/bc/C/rpc"
        );
        assert!(mainnet.params.treasury.is_some());
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let temp_dir = TempDir::new("subgenix-config").expect("Failed to create temp dir");
        let path = temp_dir.path().join("Subgenix.toml");
        std::fs::write(&path, "[fuji.network]\nchain_id = \"not a number\"\n").unwrap();

        assert!(Settings::load(NetworkProfile::Fuji, &path).is_err());
    }
}
