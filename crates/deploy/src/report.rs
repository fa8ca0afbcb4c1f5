//! Human-readable rendering of a run.

use std::fmt::Write;

use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};

use crate::{
    error::StepError,
    orchestrator::{RunReport, StepOutcome, StepRecord},
    plan::{Arg, PlanFile},
    registry::Registry,
    state::Stage,
};

fn outcome_cell(outcome: &StepOutcome) -> Cell {
    let color = match outcome {
        StepOutcome::Confirmed { .. }
        | StepOutcome::Reused { .. }
        | StepOutcome::AlreadyApplied => Color::Green,
        StepOutcome::Submitted { .. } => Color::Cyan,
        StepOutcome::Unknown(_) => Color::Yellow,
        StepOutcome::Failed(_) => Color::Red,
        StepOutcome::Skipped => Color::DarkGrey,
    };
    Cell::new(outcome).fg(color)
}

fn detail(record: &StepRecord, registry: &Registry) -> String {
    match &record.outcome {
        StepOutcome::Confirmed { tx_hash } if record.stage == Stage::Deploying => registry
            .address(&record.name)
            .map_or_else(|| tx_hash.to_string(), |address| address.to_string()),
        StepOutcome::Reused { address } => address.to_string(),
        StepOutcome::Failed(error) | StepOutcome::Unknown(error) => error.to_string(),
        other => other.tx_hash().map(|h| h.to_string()).unwrap_or_default(),
    }
}

/// Table of every step, in execution order.
pub fn steps_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Stage", "#", "Step", "Outcome", "Detail"]);

    for record in &report.steps {
        let step = if record.label.is_empty() || record.label == record.name {
            record.name.clone()
        } else {
            format!("{} ({})", record.label, record.name)
        };
        table.add_row(vec![
            Cell::new(record.stage),
            Cell::new(record.index),
            Cell::new(step),
            outcome_cell(&record.outcome),
            Cell::new(detail(record, &report.registry)),
        ]);
    }

    table
}

/// Table of the registry, in deployment order.
pub fn registry_table(registry: &Registry) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Contract", "Kind", "Address", "Deployment tx"]);

    for contract in registry.iter() {
        table.add_row(vec![
            Cell::new(&contract.name),
            Cell::new(contract.kind),
            Cell::new(contract.address),
            Cell::new(
                contract
                    .tx_hash
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    table
}

fn join_args(args: &[Arg]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Contracts and calls of a plan, in execution order.
pub fn render_plan(plan: &PlanFile) -> String {
    let mut contracts = Table::new();
    contracts
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Contract", "Kind", "Artifact", "Arguments"]);
    for (index, spec) in plan.contracts.iter().enumerate() {
        contracts.add_row(vec![
            Cell::new(index),
            Cell::new(&spec.name),
            Cell::new(spec.kind),
            Cell::new(spec.artifact_name()),
            Cell::new(join_args(&spec.args)),
        ]);
    }

    let mut calls = Table::new();
    calls
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Call", "Target", "Method", "Arguments", "Wait"]);
    for (index, call) in plan.calls.iter().enumerate() {
        calls.add_row(vec![
            Cell::new(index),
            Cell::new(call.describe()),
            Cell::new(&call.target),
            Cell::new(&call.method),
            Cell::new(join_args(&call.args)),
            Cell::new(if call.required { "confirm" } else { "submit" }),
        ]);
    }

    format!("{contracts}\n{calls}")
}

/// Full report: steps, the failure pointer if any, and the registry.
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", steps_table(report));

    match &report.failure {
        Some(failure) => {
            let _ = writeln!(
                out,
                "✗ Run failed while {} at step {} (`{}`): {}",
                failure.stage, failure.index, failure.name, failure.error
            );
            match (&failure.error, failure.error.tx_hash()) {
                (StepError::CheckpointFailed { .. }, Some(tx_hash)) => {
                    let _ = writeln!(
                        out,
                        "  Transaction {tx_hash} was confirmed but is missing from the registry file: \
                         record it by hand before resuming."
                    );
                }
                (error, Some(tx_hash)) if error.is_unknown() => {
                    let _ = writeln!(
                        out,
                        "  Transaction {tx_hash} may still be mined: check it before resuming."
                    );
                }
                _ => {}
            }
        }
        None if report.is_success() => {
            let _ = writeln!(out, "✓ Run complete");
        }
        None => {
            let _ = writeln!(out, "Run complete with failed optional calls");
        }
    }

    if report.registry.is_empty() {
        let _ = writeln!(out, "No contracts deployed.");
    } else {
        let _ = write!(out, "{}", registry_table(&report.registry));
    }

    out
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{Address, TxHash};

    use super::*;
    use crate::{
        contracts::ContractKind,
        orchestrator::FailurePointer,
        registry::DeployedContract,
        state::RunState,
    };

    #[test]
    fn test_render_plan_lists_arguments() {
        let plan = crate::presets::testnet(&Default::default());
        let rendered = render_plan(&plan);

        assert!(rendered.contains("LockUpHell"));
        assert!(rendered.contains("@sgx, @vault"));
        assert!(rendered.contains("@signer, 10000e18"));
    }

    #[test]
    fn test_render_failed_run() {
        let mut registry = Registry::new();
        registry
            .insert(DeployedContract {
                name: "sgx".to_string(),
                kind: ContractKind::Token,
                address: Address::with_last_byte(1),
                artifact: None,
                tx_hash: Some(TxHash::repeat_byte(1)),
                block_number: Some(1),
            })
            .unwrap();

        let error = StepError::DeploymentRejected {
            contract: "lockup".to_string(),
            reason: "execution reverted".to_string(),
        };
        let report = RunReport {
            state: RunState::Failed {
                stage: Stage::Deploying,
                index: 1,
            },
            steps: vec![
                StepRecord {
                    stage: Stage::Deploying,
                    index: 0,
                    name: "sgx".to_string(),
                    label: String::new(),
                    outcome: StepOutcome::Confirmed {
                        tx_hash: TxHash::repeat_byte(1),
                    },
                },
                StepRecord {
                    stage: Stage::Deploying,
                    index: 1,
                    name: "lockup".to_string(),
                    label: String::new(),
                    outcome: StepOutcome::Failed(error.clone()),
                },
            ],
            registry,
            applied_calls: Default::default(),
            failure: Some(FailurePointer {
                stage: Stage::Deploying,
                index: 1,
                name: "lockup".to_string(),
                error,
            }),
        };

        let rendered = render(&report);

        assert!(rendered.contains("execution reverted"));
        assert!(rendered.contains("at step 1 (`lockup`)"));
        assert!(rendered.contains(&Address::with_last_byte(1).to_string()));
        assert!(!rendered.contains("Run complete"));
    }

    #[test]
    fn test_render_unrecorded_confirmation() {
        let error = StepError::CheckpointFailed {
            entry: "sgx.mint".to_string(),
            tx_hash: TxHash::repeat_byte(7),
            reason: "read-only file system".to_string(),
        };
        let report = RunReport {
            state: RunState::Failed {
                stage: Stage::Configuring,
                index: 0,
            },
            steps: vec![StepRecord {
                stage: Stage::Configuring,
                index: 0,
                name: "sgx.mint".to_string(),
                label: String::new(),
                outcome: StepOutcome::Failed(error.clone()),
            }],
            registry: Registry::new(),
            applied_calls: [0].into(),
            failure: Some(FailurePointer {
                stage: Stage::Configuring,
                index: 0,
                name: "sgx.mint".to_string(),
                error,
            }),
        };

        let rendered = render(&report);

        assert!(rendered.contains("missing from the registry file"));
        assert!(!rendered.contains("may still be mined"));
    }
}
