//! Documents produced by a deployment run: the generated address set coming
//! out of the base pipeline, and the final output consumed by the
//! operational scripts. Field names match the JSON documents on disk.

use std::path::Path;

use alloy::primitives::{Address, B256};
use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::stages::{self, predicted};

/// Implementation and library addresses plus the predicted proxy addresses
/// for the live instance. Immutable once the base deployment completed: the
/// predictions must match what is observed on chain after spawning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAddresses {
    #[serde(rename = "zkEVMDeployer")]
    pub zk_evm_deployer: Address,
    pub create_children: Address,
    pub bridge_asset_operations: Address,
    pub forkable_bridge: Address,
    pub forkonomic_token: Address,
    pub chain_id_manager: Address,
    pub verifier_contract: Address,
    #[serde(rename = "forkableZkEVM")]
    pub forkable_zk_evm: Address,
    pub forkable_global_exit_root: Address,
    pub forking_manager: Address,
    pub proxy_admin: Address,
    #[serde(rename = "forkableZkEVMPredicted")]
    pub forkable_zk_evm_predicted: Address,
    pub forkable_bridge_predicted: Address,
    pub forkable_global_exit_root_predicted: Address,
    pub forking_manager_predicted: Address,
    pub forkonomic_token_predicted: Address,
}

impl GeneratedAddresses {
    pub fn from_store(store: &dyn CheckpointStore) -> OrchestratorResult<Self> {
        let get = |name: &str| {
            store
                .get(name)
                .ok_or_else(|| OrchestratorError::MissingCheckpoint(name.to_string()))
        };

        Ok(GeneratedAddresses {
            zk_evm_deployer: get(stages::ZKEVM_DEPLOYER)?,
            create_children: get(stages::CREATE_CHILDREN)?,
            bridge_asset_operations: get(stages::BRIDGE_ASSET_OPERATIONS)?,
            forkable_bridge: get(stages::FORKABLE_BRIDGE)?,
            forkonomic_token: get(stages::FORKONOMIC_TOKEN)?,
            chain_id_manager: get(stages::CHAIN_ID_MANAGER)?,
            verifier_contract: get(stages::VERIFIER_CONTRACT)?,
            forkable_zk_evm: get(stages::FORKABLE_ZKEVM)?,
            forkable_global_exit_root: get(stages::FORKABLE_GLOBAL_EXIT_ROOT)?,
            forking_manager: get(stages::FORKING_MANAGER)?,
            proxy_admin: get(stages::PROXY_ADMIN)?,
            forkable_zk_evm_predicted: get(&predicted(stages::FORKABLE_ZKEVM))?,
            forkable_bridge_predicted: get(&predicted(stages::FORKABLE_BRIDGE))?,
            forkable_global_exit_root_predicted: get(&predicted(stages::FORKABLE_GLOBAL_EXIT_ROOT))?,
            forking_manager_predicted: get(&predicted(stages::FORKING_MANAGER))?,
            forkonomic_token_predicted: get(&predicted(stages::FORKONOMIC_TOKEN))?,
        })
    }
}

/// The concrete addresses of one live (or forked-child) instance. Created
/// once at spawn time and never mutated; a fork supersedes it with two new
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    #[serde(rename = "zkEVM")]
    pub zk_evm: Address,
    pub bridge: Address,
    pub global_exit_root: Address,
    pub forking_manager: Address,
    pub forkonomic_token: Address,
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    pub genesis_root: B256,
}

/// Final human/machine-readable summary of one completed run, consumed by the
/// operational scripts and the application/chain-info stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutput {
    #[serde(rename = "zkEVMAddress")]
    pub zk_evm_address: Address,
    pub bridge_address: Address,
    pub global_exit_root_address: Address,
    pub forking_manager: Address,
    pub forkonomic_token_address: Address,
    pub create_children_implementation_address: Address,
    pub bridge_operation_implementation_address: Address,
    pub bridge_implementation_address: Address,
    pub verifier_address: Address,
    #[serde(rename = "zkEVMDeployerContract")]
    pub zk_evm_deployer_contract: Address,
    pub deployer_address: Address,
    /// -1 when the instance was already spawned and we only attached.
    pub deployment_block_number: i64,
    pub genesis_root: B256,
    pub trusted_sequencer: Address,
    #[serde(rename = "trustedSequencerURL")]
    pub trusted_sequencer_url: String,
    #[serde(rename = "chainID")]
    pub chain_id: u64,
    pub network_name: String,
    pub admin: Address,
    pub trusted_aggregator: Address,
    pub proxy_admin_address: Address,
    #[serde(rename = "forkID")]
    pub fork_id: u64,
    pub salt: B256,
    pub version: String,
    pub minter: Address,
}

impl DeploymentOutput {
    pub fn instance_record(&self) -> InstanceRecord {
        InstanceRecord {
            zk_evm: self.zk_evm_address,
            bridge: self.bridge_address,
            global_exit_root: self.global_exit_root_address,
            forking_manager: self.forking_manager,
            forkonomic_token: self.forkonomic_token_address,
            chain_id: self.chain_id,
            genesis_root: self.genesis_root,
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> OrchestratorResult<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize deployment output")?;
        std::fs::write(path.as_ref(), content).context(format!(
            "Failed to write deployment output to {}",
            path.as_ref().display()
        ))?;
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).context(format!(
            "Failed to read deployment output from {}",
            path.as_ref().display()
        ))?;
        Ok(serde_json::from_str(&content).context("Failed to parse deployment output")?)
    }
}
