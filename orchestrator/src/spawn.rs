//! Spawning one live instance from the deployed implementation set. A single
//! on-chain call creates all proxies and wires their cross-references; the
//! result must land exactly on the addresses predicted during the base
//! deployment or the run is inconsistent.

use alloy::primitives::{Address, B256, U256};
use log::{info, warn};

use crate::config::DeployParameters;
use crate::contracts::{DeploymentConfig, IForkingManager, ZkEvmInitParams};
use crate::domain::{query_contract, ChainClient};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::output::{DeploymentOutput, GeneratedAddresses};
use crate::retry::RetryPolicy;

pub struct InstanceSpawner<'a> {
    client: &'a dyn ChainClient,
    retry: RetryPolicy,
}

impl<'a> InstanceSpawner<'a> {
    pub fn new(client: &'a dyn ChainClient) -> Self {
        InstanceSpawner {
            client,
            retry: RetryPolicy::chain_default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Spawn the instance, or attach to it if this salt was already used.
    /// To spawn a genuinely new instance the operator must pick a new salt.
    pub async fn spawn_instance(
        &self,
        generated: &GeneratedAddresses,
        genesis_root: B256,
        params: &DeployParameters,
    ) -> OrchestratorResult<DeploymentOutput> {
        let deployment_config = DeploymentConfig {
            genesisRoot: genesis_root,
            trustedSequencerURL: params.trusted_sequencer_url.clone(),
            networkName: params.network_name.clone(),
            version: params.version.clone(),
            verifier: generated.verifier_contract,
            minter: params.minter,
            tokenName: params.token_name.clone(),
            tokenSymbol: params.token_symbol.clone(),
            arbitrationFee: params.arbitration_fee,
            chainIdManager: generated.chain_id_manager,
            forkPreparationTime: U256::from(params.fork_preparation_time),
            hardAssetManager: params.hard_asset_manager_address,
            lastVerifiedBatch: 0,
            lastMainnetExitRoot: B256::ZERO,
            lastRollupExitRoot: B256::ZERO,
            parentZkEvm: Address::ZERO,
            parentBridge: Address::ZERO,
            parentForkonomicToken: Address::ZERO,
            parentGlobalExitRoot: Address::ZERO,
        };

        let zk_evm_init_params = ZkEvmInitParams {
            admin: params.admin,
            trustedSequencer: params.trusted_sequencer,
            pendingStateTimeout: params.pending_state_timeout,
            trustedAggregator: params.trusted_aggregator,
            trustedAggregatorTimeout: params.trusted_aggregator_timeout,
            chainID: params.chain_id,
            forkID: params.fork_id,
            lastBatchSequenced: 0,
        };

        // idempotence gate: code at the predicted rollup address means this
        // salt already spawned an instance
        let mut deployment_block_number: i64 = -1;
        let code = self
            .client
            .get_code(generated.forkable_zk_evm_predicted)
            .await?;
        if code.is_empty() {
            let call = IForkingManager::spawnInstanceCall {
                proxyAdmin: generated.proxy_admin,
                zkEvmImplementation: generated.forkable_zk_evm,
                bridgeImplementation: generated.forkable_bridge,
                forkonomicTokenImplementation: generated.forkonomic_token,
                globalExitRootImplementation: generated.forkable_global_exit_root,
                deploymentConfig: deployment_config,
                zkEvmInitParams: zk_evm_init_params,
            };

            info!("Spawning instance via {}", generated.forking_manager);
            let outcome = self
                .retry
                .submit(
                    "spawn_instance",
                    self.client,
                    generated.forking_manager,
                    &call,
                    params.deploy_gas_limit,
                )
                .await?;
            deployment_block_number = outcome.block_number as i64;
        } else {
            warn!("Already called spawnInstance with this salt. Change the salt to spawn a new instance.");
        }

        self.verify_spawn(generated).await?;

        Ok(DeploymentOutput {
            zk_evm_address: generated.forkable_zk_evm_predicted,
            bridge_address: generated.forkable_bridge_predicted,
            global_exit_root_address: generated.forkable_global_exit_root_predicted,
            forking_manager: generated.forking_manager_predicted,
            forkonomic_token_address: generated.forkonomic_token_predicted,
            create_children_implementation_address: generated.create_children,
            bridge_operation_implementation_address: generated.bridge_asset_operations,
            bridge_implementation_address: generated.forkable_bridge,
            verifier_address: generated.verifier_contract,
            zk_evm_deployer_contract: generated.zk_evm_deployer,
            deployer_address: self.client.sender(),
            deployment_block_number,
            genesis_root,
            trusted_sequencer: params.trusted_sequencer,
            trusted_sequencer_url: params.trusted_sequencer_url.clone(),
            chain_id: params.chain_id,
            network_name: params.network_name.clone(),
            admin: params.admin,
            trusted_aggregator: params.trusted_aggregator,
            proxy_admin_address: generated.proxy_admin,
            fork_id: params.fork_id,
            salt: params.salt,
            version: params.version.clone(),
            minter: params.minter,
        })
    }

    /// All postconditions must hold or the run failed: every predicted
    /// address holds code, and the spawned forking manager recorded exactly
    /// the predicted component addresses.
    async fn verify_spawn(&self, generated: &GeneratedAddresses) -> OrchestratorResult<()> {
        let predictions = [
            ("forkableZkEVM", generated.forkable_zk_evm_predicted),
            ("forkableBridge", generated.forkable_bridge_predicted),
            (
                "forkableGlobalExitRoot",
                generated.forkable_global_exit_root_predicted,
            ),
            ("forkingManager", generated.forking_manager_predicted),
            ("forkonomicToken", generated.forkonomic_token_predicted),
        ];
        for (name, addr) in predictions {
            let code = self.client.get_code(addr).await?;
            if code.is_empty() {
                return Err(OrchestratorError::NoCodeAtPredicted(name.to_string(), addr));
            }
        }

        let manager = generated.forking_manager_predicted;
        let wired = [
            (
                "zkEVM",
                generated.forkable_zk_evm_predicted,
                query_contract(self.client, manager, IForkingManager::zkEVMCall {})
                    .await?
                    ._0,
            ),
            (
                "bridge",
                generated.forkable_bridge_predicted,
                query_contract(self.client, manager, IForkingManager::bridgeCall {})
                    .await?
                    ._0,
            ),
            (
                "forkonomicToken",
                generated.forkonomic_token_predicted,
                query_contract(self.client, manager, IForkingManager::forkonomicTokenCall {})
                    .await?
                    ._0,
            ),
            (
                "globalExitRoot",
                generated.forkable_global_exit_root_predicted,
                query_contract(self.client, manager, IForkingManager::globalExitRootCall {})
                    .await?
                    ._0,
            ),
        ];
        for (name, predicted, observed) in wired {
            if predicted != observed {
                return Err(OrchestratorError::PredictionMismatch {
                    name: name.to_string(),
                    predicted,
                    observed,
                });
            }
        }

        Ok(())
    }
}
