use std::collections::HashMap;
use std::path::Path;

use alloy::primitives::{Address, B256, U256};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub type ConfigResult<T> = Result<T, ConfigError>;

pub static GLOBAL_CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Chain not found for: {0}")]
    ChainInfoNotFound(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Failed to read parameter file {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub chains: HashMap<String, ChainInfo>,
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub name: String,
    pub rpc: String,
    /// Hardcoded fee data, used instead of the node's fee estimation when set.
    pub max_fee_per_gas_gwei: Option<u128>,
    pub max_priority_fee_per_gas_gwei: Option<u128>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    pub bridge_api_url: String,
    pub artifacts_dir: String,
}

impl Config {
    pub fn get_chain_info(&self, chain_name: &str) -> ConfigResult<&ChainInfo> {
        self.chains
            .get(chain_name)
            .ok_or(ConfigError::ChainInfoNotFound(chain_name.to_string()))
    }

    pub fn get_bridge_api_url(&self) -> String {
        self.general.bridge_api_url.to_string()
    }

    pub fn get_artifacts_dir(&self) -> String {
        self.general.artifacts_dir.to_string()
    }
}

/// Every key that must be present in the deployment parameter document.
/// Missing any of them is a startup-time fatal error, before any chain interaction.
pub const MANDATORY_DEPLOYMENT_PARAMETERS: &[&str] = &[
    "realVerifier",
    "trustedSequencerURL",
    "networkName",
    "version",
    "forkPreparationTime",
    "trustedSequencer",
    "chainID",
    "admin",
    "minter",
    "trustedAggregator",
    "trustedAggregatorTimeout",
    "pendingStateTimeout",
    "forkID",
    "salt",
    "hardAssetManagerAddress",
    "arbitrationFee",
    "tokenName",
    "tokenSymbol",
];

/// Static per-run deployment parameters.
///
/// The salt is fixed for the whole run; regenerating it mid-run would
/// invalidate every previously recorded address prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParameters {
    pub real_verifier: bool,
    #[serde(rename = "trustedSequencerURL")]
    pub trusted_sequencer_url: String,
    pub network_name: String,
    pub version: String,
    pub fork_preparation_time: u64,
    pub trusted_sequencer: Address,
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    pub admin: Address,
    pub minter: Address,
    pub trusted_aggregator: Address,
    pub trusted_aggregator_timeout: u64,
    pub pending_state_timeout: u64,
    #[serde(rename = "forkID")]
    pub fork_id: u64,
    pub salt: B256,
    pub hard_asset_manager_address: Address,
    pub arbitration_fee: U256,
    pub token_name: String,
    pub token_symbol: String,
    /// Owner of the stack deployer contract. Falls back to the deployer
    /// account when unset.
    #[serde(default, rename = "initialZkEVMDeployerOwner")]
    pub initial_zk_evm_deployer_owner: Option<Address>,
    /// Attach to an externally deployed stack deployer instead of deploying one.
    #[serde(default, rename = "zkEVMDeployerAddress")]
    pub zk_evm_deployer_address: Option<Address>,
    /// Explicit gas ceiling for large implementation deployments; estimation
    /// is unreliable for bytecode of this size.
    #[serde(default)]
    pub deploy_gas_limit: Option<u64>,
}

impl DeployParameters {
    /// Parse a raw parameter document, failing fast on any missing mandatory key.
    pub fn from_value(raw: serde_json::Value) -> ConfigResult<Self> {
        verify_deployment_parameters(MANDATORY_DEPLOYMENT_PARAMETERS, &raw)?;
        Ok(serde_json::from_value(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        Self::from_value(serde_json::from_str(&content)?)
    }
}

/// Check that every necessary parameter is fulfilled.
pub fn verify_deployment_parameters(
    mandatory: &[&str],
    raw: &serde_json::Value,
) -> ConfigResult<()> {
    for parameter_name in mandatory {
        let missing = match raw.get(parameter_name) {
            None => true,
            Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(ConfigError::MissingParameter(parameter_name.to_string()));
        }
    }
    Ok(())
}
