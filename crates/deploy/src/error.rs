//! Failure taxonomy for individual orchestration steps.

use alloy_core::primitives::TxHash;
use thiserror::Error;

/// Error raised by a single deployment or configuration step.
///
/// Infrastructure failures outside of a step (loading configuration, reading
/// artifacts, connecting to the RPC endpoint) are reported through
/// [`anyhow::Error`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The node refused or reverted a deployment transaction.
    #[error("deployment of `{contract}` rejected: {reason}")]
    DeploymentRejected { contract: String, reason: String },

    /// The transaction was submitted but no receipt was observed in time.
    ///
    /// The outcome is unknown and must be reconciled manually.
    #[error("transaction {tx_hash} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, timeout_secs: u64 },

    /// The signed transaction was sent but the node's answer was lost.
    #[error("submission of {tx_hash} unconfirmed: {reason}")]
    SubmissionUnknown { tx_hash: TxHash, reason: String },

    /// A configuration transaction was rejected or reverted.
    #[error("call `{target}.{method}` failed: {reason}")]
    ConfigCallFailed {
        target: String,
        method: String,
        reason: String,
    },

    /// A step references a contract that is not in the registry.
    #[error("`{entry}` references `{missing}` which has not been deployed")]
    DependencyUnresolved { entry: String, missing: String },

    /// The entry is malformed: duplicate name, unknown method, or arguments
    /// that do not fit the contract ABI.
    #[error("invalid entry `{entry}`: {reason}")]
    InvalidEntry { entry: String, reason: String },

    /// The step's transaction was confirmed but the progress record could not
    /// be written. The run stops so that nothing else is sent unrecorded.
    #[error("`{entry}` confirmed in {tx_hash} but progress could not be saved: {reason}")]
    CheckpointFailed {
        entry: String,
        tx_hash: TxHash,
        reason: String,
    },

    /// The run was interrupted.
    ///
    /// `tx_hash` is set when the interrupt arrived while a submitted
    /// transaction was still awaiting confirmation.
    #[error("run aborted at `{entry}`")]
    Aborted {
        entry: String,
        tx_hash: Option<TxHash>,
    },
}

impl StepError {
    /// Whether a transaction may have reached the network with an unobserved outcome.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            StepError::ConfirmationTimeout { .. }
                | StepError::SubmissionUnknown { .. }
                | StepError::Aborted {
                    tx_hash: Some(_),
                    ..
                }
        )
    }

    /// Hash of the transaction the step sent, when one may be or is on the network.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            StepError::ConfirmationTimeout { tx_hash, .. }
            | StepError::SubmissionUnknown { tx_hash, .. }
            | StepError::CheckpointFailed { tx_hash, .. } => Some(*tx_hash),
            StepError::Aborted { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}
