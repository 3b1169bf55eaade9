pub mod apps;
pub mod artifacts;
pub mod checkpoint;
pub mod claims;
pub mod clients;
pub mod config;
pub mod contracts;
pub mod create2;
pub mod deployer;
pub mod domain;
pub mod error;
pub mod fork;
pub mod macros;
pub mod mock_chain;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod spawn;
pub mod stages;
pub mod tests;

use alloy::primitives::B256;
use log::info;

use artifacts::ArtifactStore;
use checkpoint::CheckpointStore;
use config::DeployParameters;
use domain::ChainClient;
use error::OrchestratorResult;
use output::{DeploymentOutput, GeneratedAddresses};
use pipeline::{Pipeline, StageContext};
use retry::RetryPolicy;
use spawn::InstanceSpawner;

/// Run the checkpointed base deployment: stack deployer, libraries,
/// implementations, proxy admin and the predicted proxy set. Safe to re-run
/// after any failure; completed stages are skipped via the checkpoint store.
pub async fn deploy_base(
    client: &dyn ChainClient,
    params: &DeployParameters,
    artifacts: &ArtifactStore,
    store: &mut dyn CheckpointStore,
) -> OrchestratorResult<GeneratedAddresses> {
    info!("Start base deployment");
    info!("Deployer: {}", client.sender());

    let mut ctx = StageContext {
        client,
        params,
        artifacts,
        store: &mut *store,
        retry: RetryPolicy::chain_default(),
    };
    Pipeline::new(stages::base_stages()).run(&mut ctx).await?;

    let generated = GeneratedAddresses::from_store(store)?;
    info!("Base deployment complete");
    Ok(generated)
}

/// Spawn the first live instance from a completed base deployment and verify
/// the result against the predictions.
pub async fn spawn_instance(
    client: &dyn ChainClient,
    params: &DeployParameters,
    generated: &GeneratedAddresses,
    genesis_root: B256,
) -> OrchestratorResult<DeploymentOutput> {
    InstanceSpawner::new(client)
        .spawn_instance(generated, genesis_root, params)
        .await
}
