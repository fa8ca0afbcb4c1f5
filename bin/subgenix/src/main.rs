//! subgenix is a CLI tool to deploy and configure the Subgenix contracts on Avalanche.

mod cli;

use std::{
    collections::{BTreeSet, HashSet},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use cli::{Cli, Command, DeployArgs, Query};
use subgenix_deploy::{
    ArtifactStore, Orchestrator, Queries, Registry, RegistryFile, RpcChain, Settings, StepError,
    report,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let settings = load_settings(&cli)?;

    match &cli.command {
        Command::Deploy(args) => deploy(settings, args).await,
        Command::Plan { plan } => {
            let plan = plan.load(&settings.params)?;
            plan.validate(&HashSet::new()).map_err(invalid_plan)?;

            println!("{}", report::render_plan(&plan));
            tracing::info!(
                contracts = plan.contracts.len(),
                calls = plan.calls.len(),
                fingerprint = %plan.contracts.fingerprint(),
                "✓ Plan is valid"
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Query { query } => {
            run_query(settings, query).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Settings of the selected profile with the command line overrides applied.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.network, &cli.config)?;

    if let Some(rpc_url) = &cli.rpc_url {
        settings.network.rpc_url = rpc_url.clone();
    }
    if let Some(registry) = &cli.registry {
        settings.registry_path = registry.clone();
    }
    if let Some(artifacts) = &cli.artifacts {
        settings.artifacts_dir = artifacts.clone();
    }

    Ok(settings)
}

async fn deploy(settings: Settings, args: &DeployArgs) -> Result<ExitCode> {
    let plan = args.plan.load(&settings.params)?;
    let fingerprint = plan.contracts.fingerprint();
    let batch_fingerprint = plan.calls.fingerprint();
    let registry_path = settings.registry_path.clone();

    let (seed, applied) = if args.resume {
        let file = RegistryFile::load_from_file(&registry_path)?;
        file.check_resumable(settings.network.chain_id, &fingerprint, args.force)?;
        let applied = file.resumable_calls(&batch_fingerprint, args.force)?;
        tracing::info!(
            path = %registry_path.display(),
            contracts = file.contracts.len(),
            applied_calls = applied.len(),
            "Resuming from registry"
        );
        (file.contracts, applied)
    } else {
        if registry_path.exists() {
            anyhow::bail!(
                "Registry {} already exists; pass --resume to continue from it or remove it to start over",
                registry_path.display()
            );
        }
        (Registry::new(), BTreeSet::new())
    };

    let known: HashSet<String> = seed.names().map(String::from).collect();
    plan.validate(&known).map_err(invalid_plan)?;

    let mut artifacts = ArtifactStore::from_dir(&settings.artifacts_dir);
    artifacts
        .preload(plan.contracts.artifact_names().chain(seed.artifact_names()))
        .context("Failed to load contract artifacts")?;

    let chain = RpcChain::connect(&settings.network, Some(&args.private_key)).await?;

    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step...");
            let _ = abort_tx.send(true);
        }
    });

    let network = settings.network.name.clone();
    let chain_id = settings.network.chain_id;
    let checkpoint_path = registry_path.clone();
    let checkpoint_fingerprint = fingerprint.clone();
    let checkpoint_batch = batch_fingerprint.clone();

    let orchestrator = Orchestrator::new(chain, artifacts)
        .with_confirmation(
            settings.network.confirmation_timeout(),
            settings.network.poll_interval(),
        )
        .with_abort(abort_rx)
        .with_checkpoint(move |registry, applied| {
            RegistryFile::new(
                &network,
                chain_id,
                checkpoint_fingerprint.clone(),
                registry.clone(),
            )
            .with_applied_calls(checkpoint_batch.clone(), applied.clone())
            .save_to_file(&checkpoint_path)
        });

    let report = orchestrator
        .run(&plan.contracts, &plan.calls, seed, applied)
        .await?;

    // Printed first: the operator needs the report even if the final save fails.
    println!("{}", report::render(&report));

    RegistryFile::new(
        &settings.network.name,
        chain_id,
        fingerprint,
        report.registry.clone(),
    )
    .with_applied_calls(batch_fingerprint, report.applied_calls.clone())
    .save_to_file(&registry_path)
    .context("Run finished but the registry could not be saved; record the report above by hand")?;
    tracing::info!(path = %registry_path.display(), state = ?report.state, "Registry saved");

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn invalid_plan((index, error): (usize, StepError)) -> anyhow::Error {
    anyhow::anyhow!("Invalid plan at entry {index}: {error}")
}

async fn run_query(settings: Settings, query: &Query) -> Result<()> {
    let file = RegistryFile::load_from_file(&settings.registry_path)?;
    if file.chain_id != settings.network.chain_id {
        anyhow::bail!(
            "Registry {} was written for chain {} but network `{}` is chain {}",
            settings.registry_path.display(),
            file.chain_id,
            settings.network.name,
            settings.network.chain_id
        );
    }

    let mut artifacts = ArtifactStore::from_dir(&settings.artifacts_dir);
    artifacts
        .preload(file.contracts.artifact_names())
        .context("Failed to load contract artifacts")?;

    let chain = RpcChain::connect(&settings.network, None).await?;
    let queries = Queries::new(&chain, &artifacts, &file.contracts);

    match query {
        Query::Dominance { token, governance } => {
            let dominance = queries.governance_dominance(token, governance).await?;
            println!("{dominance:.2}%");
        }
        Query::Apr { vault } => {
            let apr = queries.vault_apr(vault).await?;
            println!("{apr}%");
        }
        Query::VaultInfo { user, vault } => {
            let info = queries.vault_info(vault, *user).await?;
            println!("exists:              {}", info.exists);
            println!("last claim time:     {}", info.last_claim_time);
            println!("uncollected rewards: {}", info.uncollected_rewards);
            println!("balance:             {}", info.balance);
            println!("interest length:     {}", info.interest_length);
            println!("league:              {}", info.league);
        }
    }

    Ok(())
}
