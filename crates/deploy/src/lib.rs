//! subgenix-deploy - Deployment orchestration for the Subgenix contracts.
//!
//! This crate deploys an ordered plan of contracts to an EVM network, records
//! every confirmed deployment in a registry, then applies a batch of
//! configuration calls to the deployed contracts.

pub mod artifact;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod plan;
pub mod presets;
pub mod queries;
pub mod registry;
pub mod report;
pub mod rpc;
pub mod state;
pub mod tx;

pub use artifact::{Artifact, ArtifactStore, Literal};
pub use chain::{Chain, RpcChain, SubmitError, TxReceipt, TxRequest};
pub use config::Settings;
pub use contracts::ContractKind;
pub use error::StepError;
pub use network::{GasPrice, NetworkConfig, NetworkProfile};
pub use orchestrator::{
    ConfigurationReport, DeployFailure, FailurePointer, Orchestrator, RunReport, StepOutcome,
    StepRecord,
};
pub use plan::{Arg, ConfigCall, ConfigurationBatch, ContractSpec, DeploymentPlan, PlanFile};
pub use presets::{PlanParams, PlanPreset, PlanSource};
pub use queries::{Queries, VaultInfo};
pub use registry::{DeployedContract, Registry, RegistryFile};
pub use state::{RunState, Stage};
