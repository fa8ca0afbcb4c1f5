use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use subgenix_deploy::{NetworkProfile, PlanSource, config::DEFAULT_CONFIG_FILE};
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "subgenix")]
#[command(
    author,
    version,
    about = "Deploy and configure the Subgenix contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SUBGENIX_VERBOSITY", default_value_t = LevelFilter::INFO, global = true)]
    pub verbosity: LevelFilter,

    /// The settings file. Missing files are ignored.
    #[arg(short, long, env = "SUBGENIX_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// The network profile (mainnet, fuji or local).
    #[arg(short, long, env = "SUBGENIX_PROFILE", default_value_t = NetworkProfile::Local, global = true)]
    pub network: NetworkProfile,

    /// Override the RPC endpoint of the network profile.
    #[arg(long, alias = "rpc", env = "SUBGENIX_RPC_URL", global = true)]
    pub rpc_url: Option<Url>,

    /// Override the registry file of the network profile.
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Override the compiled artifacts directory.
    #[arg(long, global = true)]
    pub artifacts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a plan, then apply its configuration calls.
    Deploy(DeployArgs),

    /// Print and validate a plan without touching a chain.
    Plan {
        /// A preset (mainnet, testnet) or the path of a TOML plan file.
        #[arg(short, long, env = "SUBGENIX_PLAN")]
        plan: PlanSource,
    },

    /// Read-only queries against the contracts of a registry file.
    Query {
        #[command(subcommand)]
        query: Query,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    /// A preset (mainnet, testnet) or the path of a TOML plan file.
    #[arg(short, long, env = "SUBGENIX_PLAN")]
    pub plan: PlanSource,

    /// Private key of the deployer account.
    #[arg(long, env = "SUBGENIX_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Continue from the existing registry file, reusing the contracts it records.
    #[arg(long)]
    pub resume: bool,

    /// Resume even if the plan changed since the registry was written.
    #[arg(long, requires = "resume")]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum Query {
    /// Share of the SGX supply locked in the governance contract.
    Dominance {
        #[arg(long, default_value = "sgx")]
        token: String,
        #[arg(long, default_value = "gsgx")]
        governance: String,
    },

    /// Yearly interest rate of the vaults.
    Apr {
        #[arg(long, default_value = "vault")]
        vault: String,
    },

    /// Vault of one user.
    VaultInfo {
        /// The vault owner.
        user: Address,
        #[arg(long, default_value = "vault")]
        vault: String,
    },
}

#[cfg(test)]
mod tests {
    use subgenix_deploy::PlanPreset;

    use super::*;

    #[test]
    fn test_deploy_arguments() {
        let cli = Cli::try_parse_from([
            "subgenix",
            "--network",
            "fuji",
            "deploy",
            "--plan",
            "testnet",
            "--private-key",
            "0x01",
            "--resume",
        ])
        .unwrap();

        assert_eq!(cli.network, NetworkProfile::Fuji);
        let Command::Deploy(args) = cli.command else {
            panic!("expected the deploy command");
        };
        assert_eq!(args.plan, PlanSource::Preset(PlanPreset::Testnet));
        assert!(args.resume);
        assert!(!args.force);
    }

    #[test]
    fn test_force_requires_resume() {
        let result = Cli::try_parse_from([
            "subgenix",
            "deploy",
            "--plan",
            "plans/custom.toml",
            "--private-key",
            "0x01",
            "--force",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_vault_info_parses_address() {
        let cli = Cli::try_parse_from([
            "subgenix",
            "query",
            "vault-info",
            "0x11C0402CA8326a118A28abA79E8ddBCC69b3C910",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Command::Query {
                query: Query::VaultInfo { .. }
            }
        ));
    }
}
