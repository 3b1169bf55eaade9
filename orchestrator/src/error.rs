use alloy::primitives::Address;
use thiserror::Error;

use crate::{
    artifacts::ArtifactError, checkpoint::CheckpointError, claims::ClaimError, config::ConfigError,
    domain::ChainClientError,
};

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Error(#[from] anyhow::Error),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("Chain Client Error")]
    ChainClient(#[from] ChainClientError),

    #[error("Config Error")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Stage {0} requires {1} which has not been deployed yet")]
    MissingDependency(String, String),

    #[error("Checkpoint is missing an address for: {0}")]
    MissingCheckpoint(String),

    #[error("Checkpointed address {1} for {0} has no code on chain")]
    CheckpointedCodeMissing(String, Address),

    #[error("No code at predicted address {1} for {0} after spawning")]
    NoCodeAtPredicted(String, Address),

    #[error("Predicted address mismatch for {name}: predicted {predicted}, observed {observed}")]
    PredictionMismatch {
        name: String,
        predicted: Address,
        observed: Address,
    },

    #[error("Deployment confirmed but no code found at {0}")]
    DeployedCodeMissing(Address),

    #[error("Transaction {0} reverted on chain")]
    TransactionReverted(String),

    #[error("A fork is already proposed for this instance")]
    ForkAlreadyProposed,

    #[error("The fork was already executed for this instance")]
    ForkAlreadyExecuted,

    #[error("No fork proposal exists for this instance")]
    NoForkProposed,
}

impl OrchestratorError {
    pub fn generic_err(msg: impl Into<String>) -> Self {
        OrchestratorError::Generic(msg.into())
    }

    /// Whether the retry policy may resubmit after this error.
    /// Only chain-level transport/transaction failures qualify; configuration,
    /// precondition and consistency errors are always fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            OrchestratorError::ChainClient(e) => e.is_transient(),
            OrchestratorError::TransactionReverted(_) => false,
            _ => false,
        }
    }
}
