//! Sequential deployment and configuration of a plan.
//!
//! A run deploys every contract of a [`DeploymentPlan`] in order, recording
//! each confirmed deployment in a [`Registry`], then applies a
//! [`ConfigurationBatch`] against that registry. Nothing runs concurrently:
//! each transaction is confirmed (or deliberately not waited for) before the
//! next one is prepared.
//!
//! Transactions are never retried. A transaction whose confirmation was not
//! observed is reported as unknown and left for manual reconciliation.
//! Configuration calls sent by an earlier run are passed in as applied and
//! are not sent again.

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    time::Duration,
};

use alloy_core::primitives::{
    Address, TxHash, U256,
    utils::{ParseUnits, parse_units},
};
use anyhow::Result;
use tokio::sync::watch;

use crate::{
    artifact::{ArtifactStore, Literal},
    chain::{Chain, SubmitError, TxReceipt, TxRequest},
    error::StepError,
    network::{DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS},
    plan::{Arg, ConfigCall, ConfigurationBatch, ContractSpec, DeploymentPlan},
    registry::{DeployedContract, Registry},
    rpc,
    state::{RunState, Stage},
};

/// Callback persisting progress: the registry and the indexes of the applied
/// calls. Invoked after every confirmed deployment and every sent call.
pub type Checkpoint = Box<dyn Fn(&Registry, &BTreeSet<usize>) -> Result<()> + Send + Sync>;

/// What happened to one step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The transaction was mined successfully.
    Confirmed { tx_hash: TxHash },
    /// The contract was already in the seed registry and was not redeployed.
    Reused { address: Address },
    /// Sent without waiting for confirmation.
    Submitted { tx_hash: TxHash },
    /// The call was sent by an earlier run and is not sent again.
    AlreadyApplied,
    Failed(StepError),
    /// The transaction may be on the network; its outcome was not observed.
    Unknown(StepError),
    /// Never attempted because an earlier step halted the run.
    Skipped,
}

impl StepOutcome {
    fn from_error(error: StepError) -> Self {
        if error.is_unknown() {
            StepOutcome::Unknown(error)
        } else {
            StepOutcome::Failed(error)
        }
    }

    /// Hash of a transaction this step sent successfully.
    fn sent(&self) -> Option<TxHash> {
        match self {
            StepOutcome::Confirmed { tx_hash } | StepOutcome::Submitted { tx_hash } => {
                Some(*tx_hash)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            StepOutcome::Failed(error) | StepOutcome::Unknown(error) => Some(error),
            _ => None,
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            StepOutcome::Confirmed { tx_hash } | StepOutcome::Submitted { tx_hash } => {
                Some(*tx_hash)
            }
            StepOutcome::Failed(error) | StepOutcome::Unknown(error) => error.tx_hash(),
            StepOutcome::Reused { .. } | StepOutcome::AlreadyApplied | StepOutcome::Skipped => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepOutcome::Confirmed { .. } => "confirmed",
            StepOutcome::Reused { .. } => "reused",
            StepOutcome::Submitted { .. } => "submitted",
            StepOutcome::AlreadyApplied => "already applied",
            StepOutcome::Failed(_) => "failed",
            StepOutcome::Unknown(_) => "unknown",
            StepOutcome::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One attempted (or skipped) step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub stage: Stage,
    /// Index of the entry in the plan or the batch.
    pub index: usize,
    /// Contract name for deployments, `target.method` for calls.
    pub name: String,
    /// Progress label of a call; empty for deployments.
    pub label: String,
    pub outcome: StepOutcome,
}

impl StepRecord {
    fn deployment(index: usize, spec: &ContractSpec, outcome: StepOutcome) -> Self {
        Self {
            stage: Stage::Deploying,
            index,
            name: spec.name.clone(),
            label: String::new(),
            outcome,
        }
    }

    fn call(index: usize, call: &ConfigCall, outcome: StepOutcome) -> Self {
        Self {
            stage: Stage::Configuring,
            index,
            name: call.qualified_name(),
            label: call.describe().to_string(),
            outcome,
        }
    }
}

/// The deployment stage stopped at `index`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("deployment failed at entry {index} (`{name}`): {error}")]
pub struct DeployFailure {
    pub index: usize,
    pub name: String,
    pub error: StepError,
    /// The contracts confirmed before the failing entry, seed included. When
    /// the failure is a [`StepError::CheckpointFailed`] the failing entry itself
    /// was confirmed and is included too.
    pub registry: Registry,
}

/// Outcome of every call of a configuration batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationReport {
    pub records: Vec<StepRecord>,
    /// Index of the call that halted the batch.
    pub halted_at: Option<usize>,
    /// Calls applied by this or an earlier run.
    pub applied: BTreeSet<usize>,
}

impl ConfigurationReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every call was confirmed or submitted.
    pub fn is_clean(&self) -> bool {
        self.records.iter().all(|r| r.outcome.error().is_none()) && self.halted_at.is_none()
    }

    fn push(&mut self, index: usize, call: &ConfigCall, outcome: StepOutcome) {
        self.records.push(StepRecord::call(index, call, outcome));
    }
}

/// Where a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePointer {
    pub stage: Stage,
    pub index: usize,
    pub name: String,
    pub error: StepError,
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub state: RunState,
    /// Every step attempted, in order, followed by skipped calls.
    pub steps: Vec<StepRecord>,
    /// The registry as it stood when the run ended.
    pub registry: Registry,
    /// Indexes of the batch calls applied so far, earlier runs included.
    pub applied_calls: BTreeSet<usize>,
    pub failure: Option<FailurePointer>,
}

impl RunReport {
    /// Whether the run reached `Done` without any failed or unknown step.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Done && self.steps.iter().all(|s| s.outcome.error().is_none())
    }

    pub fn steps_in(&self, stage: Stage) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(move |s| s.stage == stage)
    }
}

/// Drives a plan and a batch against a [`Chain`].
pub struct Orchestrator<C> {
    chain: C,
    artifacts: ArtifactStore,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    abort: Option<watch::Receiver<bool>>,
    checkpoint: Option<Checkpoint>,
}

impl<C: Chain> Orchestrator<C> {
    pub fn new(chain: C, artifacts: ArtifactStore) -> Self {
        Self {
            chain,
            artifacts,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            abort: None,
            checkpoint: None,
        }
    }

    /// How long to wait for a receipt, and how often to ask for it.
    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Stop the run once `true` is sent on the channel.
    pub fn with_abort(mut self, abort: watch::Receiver<bool>) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Persist progress after every confirmed deployment and every sent call.
    ///
    /// A checkpoint error stops the run before the next transaction.
    pub fn with_checkpoint(
        mut self,
        checkpoint: impl Fn(&Registry, &BTreeSet<usize>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.checkpoint = Some(Box::new(checkpoint));
        self
    }

    /// Deploy `plan` in order, starting from `seed`.
    ///
    /// Entries already in `seed` are reused. On failure nothing is rolled
    /// back and no further transaction is sent.
    pub async fn deploy(
        &self,
        plan: &DeploymentPlan,
        seed: Registry,
    ) -> Result<Registry, DeployFailure> {
        self.deploy_steps(plan, seed, &BTreeSet::new(), &mut Vec::new()).await
    }

    /// Apply `batch` in order against a complete registry.
    ///
    /// Calls whose index is in `applied` were sent by an earlier run and are
    /// reported as [`StepOutcome::AlreadyApplied`] without being sent again.
    pub async fn configure(
        &self,
        batch: &ConfigurationBatch,
        registry: &Registry,
        applied: BTreeSet<usize>,
    ) -> ConfigurationReport {
        let mut report = ConfigurationReport {
            applied,
            ..Default::default()
        };

        let available: HashSet<String> = registry.names().map(String::from).collect();
        if let Err((halt, error)) = batch.validate(&available) {
            tracing::error!(index = halt, error = %error, "✗ Configuration batch references unknown contracts");
            for (index, call) in batch.iter().enumerate() {
                let outcome = if index == halt {
                    StepOutcome::Failed(error.clone())
                } else if report.applied.contains(&index) {
                    StepOutcome::AlreadyApplied
                } else {
                    StepOutcome::Skipped
                };
                report.push(index, call, outcome);
            }
            report.halted_at = Some(halt);
            return report;
        }

        if !batch.is_empty() {
            tracing::info!(
                calls = batch.len(),
                already_applied = report.applied.len(),
                "Starting configuration..."
            );
        }

        for (index, call) in batch.iter().enumerate() {
            if report.applied.contains(&index) {
                tracing::info!(index, call = call.describe(), "↷ Call applied by an earlier run");
                report.push(index, call, StepOutcome::AlreadyApplied);
                continue;
            }

            if report.halted_at.is_some() {
                report.push(index, call, StepOutcome::Skipped);
                continue;
            }

            let mut outcome = if self.abort_requested() {
                StepOutcome::Failed(StepError::Aborted {
                    entry: call.qualified_name(),
                    tx_hash: None,
                })
            } else {
                match self.apply_call(call, registry).await {
                    Ok(outcome) => outcome,
                    Err(error) => StepOutcome::from_error(error),
                }
            };

            if let Some(tx_hash) = outcome.sent() {
                report.applied.insert(index);
                if let Err(e) = self.save_checkpoint(registry, &report.applied) {
                    outcome = StepOutcome::Failed(StepError::CheckpointFailed {
                        entry: call.qualified_name(),
                        tx_hash,
                        reason: format!("{e:#}"),
                    });
                }
            }

            let halts = outcome
                .error()
                .is_some_and(|error| call.required || halts_batch(error));

            match &outcome {
                StepOutcome::Confirmed { tx_hash } => {
                    tracing::info!(index, call = call.describe(), tx_hash = %tx_hash, "✓ Call confirmed");
                }
                StepOutcome::Submitted { tx_hash } => {
                    tracing::info!(index, call = call.describe(), tx_hash = %tx_hash, "✓ Call submitted");
                }
                other => {
                    let error = other.error().map(ToString::to_string).unwrap_or_default();
                    if halts {
                        tracing::error!(index, call = call.describe(), error = %error, "✗ Call {other}, halting configuration");
                    } else {
                        tracing::warn!(index, call = call.describe(), error = %error, "Optional call {other}, continuing");
                    }
                }
            }

            report.push(index, call, outcome);
            if halts {
                report.halted_at = Some(index);
            }
        }

        report
    }

    /// Deploy `plan`, then apply `batch` if every contract was deployed.
    ///
    /// `seed` and `applied` carry the progress of an earlier run: contracts
    /// already deployed and calls already sent.
    ///
    /// Errors only on an internal state machine violation; step failures are
    /// reported in the returned [`RunReport`].
    pub async fn run(
        &self,
        plan: &DeploymentPlan,
        batch: &ConfigurationBatch,
        seed: Registry,
        applied: BTreeSet<usize>,
    ) -> Result<RunReport> {
        let mut report = RunReport {
            state: RunState::NotStarted.advance()?,
            steps: Vec::new(),
            registry: Registry::new(),
            applied_calls: BTreeSet::new(),
            failure: None,
        };

        tracing::info!(contracts = plan.len(), calls = batch.len(), "Starting deployment...");

        match self.deploy_steps(plan, seed, &applied, &mut report.steps).await {
            Ok(registry) => report.registry = registry,
            Err(failure) => {
                report.state = report.state.fail(failure.index)?;
                report.registry = failure.registry;
                report.applied_calls = applied;
                report.failure = Some(FailurePointer {
                    stage: Stage::Deploying,
                    index: failure.index,
                    name: failure.name,
                    error: failure.error,
                });
                return Ok(report);
            }
        }

        report.state = report.state.advance()?;
        tracing::info!(contracts = report.registry.len(), "✓ All contracts deployed");

        let configuration = self.configure(batch, &report.registry, applied).await;
        report.applied_calls = configuration.applied.clone();

        match configuration.halted_at {
            Some(index) => {
                report.state = report.state.fail(index)?;
                report.failure = configuration
                    .records
                    .iter()
                    .find(|r| r.index == index)
                    .and_then(|r| {
                        r.outcome.error().map(|error| FailurePointer {
                            stage: Stage::Configuring,
                            index,
                            name: r.name.clone(),
                            error: error.clone(),
                        })
                    });
            }
            None => {
                report.state = report.state.advance()?;
                tracing::info!("✓ Configuration complete");
            }
        }

        report.steps.extend(configuration.records);
        Ok(report)
    }

    async fn deploy_steps(
        &self,
        plan: &DeploymentPlan,
        seed: Registry,
        applied: &BTreeSet<usize>,
        records: &mut Vec<StepRecord>,
    ) -> Result<Registry, DeployFailure> {
        let mut registry = seed;

        if let Err((index, error)) = self.preflight(plan, &registry) {
            let spec = &plan[index];
            tracing::error!(index, contract = %spec.name, error = %error, "✗ Invalid deployment plan");
            records.push(StepRecord::deployment(index, spec, StepOutcome::Failed(error.clone())));
            return Err(DeployFailure {
                index,
                name: spec.name.clone(),
                error,
                registry,
            });
        }

        for (index, spec) in plan.iter().enumerate() {
            let result = match registry.get(&spec.name) {
                Some(existing) => reuse(spec, existing).map(|address| {
                    tracing::info!(index, contract = %spec.name, address = %address, "↷ Reusing deployed contract");
                    (StepOutcome::Reused { address }, None)
                }),
                None if self.abort_requested() => Err(StepError::Aborted {
                    entry: spec.name.clone(),
                    tx_hash: None,
                }),
                None => {
                    tracing::info!(index, contract = %spec.name, kind = %spec.kind, "Deploying contract...");
                    self.deploy_entry(spec, &registry).await.map(|deployed| {
                        let tx_hash = deployed.tx_hash.unwrap_or_default();
                        (StepOutcome::Confirmed { tx_hash }, Some(deployed))
                    })
                }
            };

            let (outcome, deployed) = match result {
                Ok(ok) => ok,
                Err(error) => {
                    tracing::error!(index, contract = %spec.name, error = %error, "✗ Deployment failed");
                    records.push(StepRecord::deployment(
                        index,
                        spec,
                        StepOutcome::from_error(error.clone()),
                    ));
                    return Err(DeployFailure {
                        index,
                        name: spec.name.clone(),
                        error,
                        registry,
                    });
                }
            };

            if let Some(deployed) = deployed {
                tracing::info!(
                    index,
                    contract = %deployed.name,
                    address = %deployed.address,
                    block = ?deployed.block_number,
                    "✓ Contract deployed"
                );
                let tx_hash = deployed.tx_hash.unwrap_or_default();
                let stored = registry
                    .insert(deployed)
                    .map_err(|e| StepError::InvalidEntry {
                        entry: spec.name.clone(),
                        reason: e.to_string(),
                    })
                    .and_then(|()| {
                        self.save_checkpoint(&registry, applied).map_err(|e| {
                            StepError::CheckpointFailed {
                                entry: spec.name.clone(),
                                tx_hash,
                                reason: format!("{e:#}"),
                            }
                        })
                    });

                if let Err(error) = stored {
                    tracing::error!(index, contract = %spec.name, error = %error, "✗ Deployment not recorded");
                    records.push(StepRecord::deployment(
                        index,
                        spec,
                        StepOutcome::Failed(error.clone()),
                    ));
                    return Err(DeployFailure {
                        index,
                        name: spec.name.clone(),
                        error,
                        registry,
                    });
                }
            }

            records.push(StepRecord::deployment(index, spec, outcome));
        }

        Ok(registry)
    }

    /// Plan-level checks run before the first transaction: unique names,
    /// backward references and a loaded artifact for every entry to deploy.
    fn preflight(&self, plan: &DeploymentPlan, seed: &Registry) -> Result<(), (usize, StepError)> {
        let known: HashSet<String> = seed.names().map(String::from).collect();
        plan.validate(&known)?;

        for (index, spec) in plan.iter().enumerate() {
            if !seed.contains(&spec.name) && self.artifacts.get(spec.artifact_name()).is_none() {
                return Err((
                    index,
                    StepError::InvalidEntry {
                        entry: spec.name.clone(),
                        reason: format!("artifact `{}` is not loaded", spec.artifact_name()),
                    },
                ));
            }
        }

        Ok(())
    }

    async fn deploy_entry(
        &self,
        spec: &ContractSpec,
        registry: &Registry,
    ) -> Result<DeployedContract, StepError> {
        let args = self.resolve(&spec.name, &spec.args, registry)?;
        for (param, arg) in spec.labelled_args() {
            tracing::debug!(contract = %spec.name, param = %param, value = %arg, "Constructor argument");
        }

        let invalid = |reason: String| StepError::InvalidEntry {
            entry: spec.name.clone(),
            reason,
        };
        let artifact = self
            .artifacts
            .get(spec.artifact_name())
            .ok_or_else(|| invalid(format!("artifact `{}` is not loaded", spec.artifact_name())))?;
        let code = artifact.encode_deploy(&args).map_err(invalid)?;

        let tx_hash = self
            .chain
            .submit(TxRequest::create(code))
            .await
            .map_err(|e| match e {
                SubmitError::Rejected(reason) => StepError::DeploymentRejected {
                    contract: spec.name.clone(),
                    reason,
                },
                SubmitError::Unknown { tx_hash, reason } => {
                    StepError::SubmissionUnknown { tx_hash, reason }
                }
            })?;
        tracing::info!(contract = %spec.name, tx_hash = %tx_hash, "Waiting for deployment confirmation...");

        let receipt = self.confirm(&spec.name, tx_hash).await?;
        let rejected = |reason: String| StepError::DeploymentRejected {
            contract: spec.name.clone(),
            reason,
        };
        if !receipt.success {
            return Err(rejected(format!("transaction {tx_hash} reverted")));
        }
        let address = receipt
            .contract_address
            .ok_or_else(|| rejected(format!("receipt of {tx_hash} has no contract address")))?;

        Ok(DeployedContract {
            name: spec.name.clone(),
            kind: spec.kind,
            address,
            artifact: spec.artifact.clone(),
            tx_hash: Some(tx_hash),
            block_number: receipt.block_number,
        })
    }

    async fn apply_call(
        &self,
        call: &ConfigCall,
        registry: &Registry,
    ) -> Result<StepOutcome, StepError> {
        let entry = call.qualified_name();
        let target = registry
            .get(&call.target)
            .ok_or_else(|| StepError::DependencyUnresolved {
                entry: entry.clone(),
                missing: call.target.clone(),
            })?;
        let args = self.resolve(&entry, &call.args, registry)?;

        let invalid = |reason: String| StepError::InvalidEntry {
            entry: entry.clone(),
            reason,
        };
        let artifact = self
            .artifacts
            .get(target.artifact_name())
            .ok_or_else(|| {
                invalid(format!("artifact `{}` is not loaded", target.artifact_name()))
            })?;
        let data = artifact.encode_call(&call.method, &args).map_err(invalid)?;

        let failed = |reason: String| StepError::ConfigCallFailed {
            target: call.target.clone(),
            method: call.method.clone(),
            reason,
        };
        let tx_hash = self
            .chain
            .submit(TxRequest::call(target.address, data))
            .await
            .map_err(|e| match e {
                SubmitError::Rejected(reason) => failed(reason),
                SubmitError::Unknown { tx_hash, reason } => {
                    StepError::SubmissionUnknown { tx_hash, reason }
                }
            })?;

        if !call.required {
            return Ok(StepOutcome::Submitted { tx_hash });
        }

        let receipt = self.confirm(&entry, tx_hash).await?;
        if !receipt.success {
            return Err(failed(format!("transaction {tx_hash} reverted")));
        }

        Ok(StepOutcome::Confirmed { tx_hash })
    }

    /// Turn arguments into literals, looking references up in `registry`.
    fn resolve(
        &self,
        entry: &str,
        args: &[Arg],
        registry: &Registry,
    ) -> Result<Vec<Literal>, StepError> {
        args.iter()
            .map(|arg| match arg {
                Arg::Ref(name) => registry.address(name).map(Literal::Address).ok_or_else(|| {
                    StepError::DependencyUnresolved {
                        entry: entry.to_string(),
                        missing: name.clone(),
                    }
                }),
                Arg::Signer => Ok(Literal::Address(self.chain.sender())),
                Arg::Value(literal) => Ok(Literal::Text(literal.clone())),
                Arg::Units { amount, decimals } => scale_units(amount, *decimals)
                    .map(|value| Literal::Text(value.to_string()))
                    .map_err(|reason| StepError::InvalidEntry {
                        entry: entry.to_string(),
                        reason,
                    }),
            })
            .collect()
    }

    /// Wait for the receipt of `tx_hash`, giving up on timeout or abort.
    async fn confirm(&self, entry: &str, tx_hash: TxHash) -> Result<TxReceipt, StepError> {
        let receipt = rpc::poll_until(
            "transaction receipt",
            self.confirmation_timeout,
            self.poll_interval,
            || self.chain.receipt(tx_hash),
        );

        // A receipt that is ready wins over an abort arriving at the same time.
        tokio::select! {
            biased;
            result = receipt => result.map_err(|_| StepError::ConfirmationTimeout {
                tx_hash,
                timeout_secs: self.confirmation_timeout.as_secs(),
            }),
            () = self.abort_signal() => Err(StepError::Aborted {
                entry: entry.to_string(),
                tx_hash: Some(tx_hash),
            }),
        }
    }

    fn abort_requested(&self) -> bool {
        self.abort.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once an abort is requested; never if the sender is gone.
    async fn abort_signal(&self) {
        if let Some(rx) = &self.abort {
            let mut rx = rx.clone();
            if rx.wait_for(|aborted| *aborted).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }

    fn save_checkpoint(&self, registry: &Registry, applied: &BTreeSet<usize>) -> Result<()> {
        match &self.checkpoint {
            Some(checkpoint) => checkpoint(registry, applied),
            None => Ok(()),
        }
    }
}

/// Errors that stop a batch even when the failing call is optional.
fn halts_batch(error: &StepError) -> bool {
    matches!(
        error,
        StepError::DependencyUnresolved { .. }
            | StepError::InvalidEntry { .. }
            | StepError::CheckpointFailed { .. }
            | StepError::Aborted { .. }
    )
}

fn reuse(spec: &ContractSpec, existing: &DeployedContract) -> Result<Address, StepError> {
    if existing.kind != spec.kind {
        return Err(StepError::InvalidEntry {
            entry: spec.name.clone(),
            reason: format!(
                "already registered as a {} at {}",
                existing.kind, existing.address
            ),
        });
    }
    Ok(existing.address)
}

/// `amount * 10^decimals`, rejecting negative and malformed amounts.
fn scale_units(amount: &str, decimals: u8) -> Result<U256, String> {
    match parse_units(amount, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(format!("negative amount `{amount}`")),
        Err(e) => Err(format!("invalid amount `{amount}` with {decimals} decimals: {e}")),
    }
}
