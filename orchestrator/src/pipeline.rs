//! Ordered, resumable execution of deployment stages. Each stage consults
//! the checkpoint store before doing anything; completed stages are attached
//! to (with a sanity check) instead of re-run, so the pipeline can be
//! restarted after any failure and will continue exactly where it stopped.

use std::collections::HashMap;

use alloy::primitives::Address;
use async_trait::async_trait;
use log::info;

use crate::artifacts::ArtifactStore;
use crate::checkpoint::CheckpointStore;
use crate::config::DeployParameters;
use crate::deployer::Create2Deployer;
use crate::domain::ChainClient;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::retry::RetryPolicy;
use crate::stages::ZKEVM_DEPLOYER;

pub struct StageContext<'a> {
    pub client: &'a dyn ChainClient,
    pub params: &'a DeployParameters,
    pub artifacts: &'a ArtifactStore,
    pub store: &'a mut dyn CheckpointStore,
    pub retry: RetryPolicy,
}

impl StageContext<'_> {
    /// A previously checkpointed address, required by the current stage.
    pub fn address(&self, name: &str) -> OrchestratorResult<Address> {
        self.store
            .get(name)
            .ok_or_else(|| OrchestratorError::MissingCheckpoint(name.to_string()))
    }

    /// Record a stage output. Persisted durably before this returns.
    pub fn record(&mut self, name: &str, addr: Address) -> OrchestratorResult<()> {
        self.store.set(name, addr)?;
        Ok(())
    }

    /// The deterministic deployer, available once the stack deployer stage ran.
    pub fn deployer(&self) -> OrchestratorResult<Create2Deployer<'_>> {
        let addr = self.address(ZKEVM_DEPLOYER)?;
        Ok(Create2Deployer::new(self.client, addr, self.retry))
    }

    /// Resolve checkpointed library addresses into a link map.
    pub fn libraries(
        &self,
        libs: &[(&str, &str)],
    ) -> OrchestratorResult<HashMap<String, Address>> {
        let mut map = HashMap::new();
        for (checkpoint_name, library_name) in libs {
            map.insert(library_name.to_string(), self.address(checkpoint_name)?);
        }
        Ok(map)
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Checkpoint keys this stage writes. The stage is skipped when all of
    /// them are already present.
    fn outputs(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    /// Checkpoint keys that must exist before this stage may run.
    fn requires(&self) -> Vec<String> {
        vec![]
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()>;

    /// Sanity check performed instead of `run` when every output is already
    /// checkpointed. The default confirms the recorded addresses still hold
    /// code on chain.
    async fn attach(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        for name in self.outputs() {
            let addr = ctx.address(&name)?;
            let code = ctx.client.get_code(addr).await?;
            if code.is_empty() {
                return Err(OrchestratorError::CheckpointedCodeMissing(name, addr));
            }
        }
        Ok(())
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Pipeline { stages }
    }

    /// Stages execute strictly in order; a stage failure aborts the whole
    /// run. The checkpoint store guarantees the next run resumes after the
    /// last successful stage.
    pub async fn run(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        for stage in &self.stages {
            let completed = stage.outputs().iter().all(|o| ctx.store.get(o).is_some());
            if completed {
                info!("Stage {} already deployed, attaching", stage.name());
                stage.attach(ctx).await?;
                continue;
            }

            for required in stage.requires() {
                if ctx.store.get(&required).is_none() {
                    return Err(OrchestratorError::MissingDependency(
                        stage.name().to_string(),
                        required,
                    ));
                }
            }

            info!("Running stage {}", stage.name());
            stage.run(ctx).await?;
        }
        Ok(())
    }
}
