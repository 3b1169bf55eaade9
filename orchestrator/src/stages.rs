//! The base-deployment stage list: the stack deployer itself, the linked
//! libraries, every implementation contract, the proxy admin and finally the
//! predicted proxy set for the first live instance. Order matters: libraries
//! before the contracts that link them, the proxy admin before any proxy,
//! the verifier before the rollup that references it.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use log::info;

use crate::config::DeployParameters;
use crate::contracts::{IProxyAdmin, IStackDeployer};
use crate::create2::predict_transparent_proxy_address;
use crate::domain::query_contract;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::macros::ensure;
use crate::pipeline::{Stage, StageContext};

pub const ZKEVM_DEPLOYER: &str = "zkEVMDeployer";
pub const CREATE_CHILDREN: &str = "createChildren";
pub const BRIDGE_ASSET_OPERATIONS: &str = "bridgeAssetOperations";
pub const FORKABLE_BRIDGE: &str = "forkableBridge";
pub const FORKONOMIC_TOKEN: &str = "forkonomicToken";
pub const CHAIN_ID_MANAGER: &str = "chainIdManager";
pub const VERIFIER_CONTRACT: &str = "verifierContract";
pub const FORKABLE_ZKEVM: &str = "forkableZkEVM";
pub const FORKABLE_GLOBAL_EXIT_ROOT: &str = "forkableGlobalExitRoot";
pub const FORKING_MANAGER: &str = "forkingManager";
pub const PROXY_ADMIN: &str = "proxyAdmin";

pub const PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

/// Every component of the live instance that gets a predicted proxy.
pub const PROXIED_COMPONENTS: &[&str] = &[
    FORKABLE_GLOBAL_EXIT_ROOT,
    FORKABLE_ZKEVM,
    FORKING_MANAGER,
    FORKONOMIC_TOKEN,
    FORKABLE_BRIDGE,
];

pub fn predicted(name: &str) -> String {
    format!("{name}Predicted")
}

/// Deploys (or attaches to) the stack deployer that all create2 deployments
/// go through. Its own address is not content-addressed, so it is the one
/// stage recorded purely through the checkpoint store.
struct ZkEvmDeployerStage;

#[async_trait]
impl Stage for ZkEvmDeployerStage {
    fn name(&self) -> &str {
        ZKEVM_DEPLOYER
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        if let Some(addr) = ctx.params.zk_evm_deployer_address {
            let code = ctx.client.get_code(addr).await?;
            if code.is_empty() {
                return Err(OrchestratorError::Precondition(format!(
                    "configured stack deployer {addr} has no code on chain"
                )));
            }
            info!("Stack deployer was already deployed on: {addr}");
            ctx.record(ZKEVM_DEPLOYER, addr)?;
        } else {
            let owner = match ctx.params.initial_zk_evm_deployer_owner {
                Some(owner) => owner,
                None => {
                    let owner = ctx.client.sender();
                    info!("initialZkEVMDeployerOwner not set, using deployer, {owner}");
                    owner
                }
            };

            let init_code =
                ctx.artifacts
                    .init_code("ZkEvmDeployer", &Default::default(), &owner.abi_encode())?;
            let outcome = ctx
                .client
                .send_transaction(TransactionRequest::default().with_deploy_code(init_code))
                .await?;
            ensure!(
                outcome.success,
                OrchestratorError::TransactionReverted(outcome.tx_hash.to_string())
            );
            let addr = outcome.contract_address.ok_or(
                OrchestratorError::generic_err("deployment receipt carries no contract address"),
            )?;

            info!("Stack deployer deployed on: {addr}");
            ctx.record(ZKEVM_DEPLOYER, addr)?;
        }

        check_deployer_owner(ctx).await
    }

    async fn attach(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        let addr = ctx.address(ZKEVM_DEPLOYER)?;
        let code = ctx.client.get_code(addr).await?;
        if code.is_empty() {
            return Err(OrchestratorError::CheckpointedCodeMissing(
                ZKEVM_DEPLOYER.to_string(),
                addr,
            ));
        }
        check_deployer_owner(ctx).await
    }
}

/// The deployer account must still own the stack deployer; anything else
/// means we resumed with the wrong signer.
async fn check_deployer_owner(ctx: &StageContext<'_>) -> OrchestratorResult<()> {
    let addr = ctx.address(ZKEVM_DEPLOYER)?;
    let owner = query_contract(ctx.client, addr, IStackDeployer::ownerCall {})
        .await?
        ._0;
    if owner != ctx.client.sender() {
        return Err(OrchestratorError::Precondition(format!(
            "wrong deployer address: stack deployer is owned by {owner}, sending from {}",
            ctx.client.sender()
        )));
    }
    Ok(())
}

/// One create2-deployed contract: artifact, linked libraries, constructor
/// arguments and an optional call executed in the same on-chain step.
struct Create2Stage {
    name: &'static str,
    artifact: fn(&DeployParameters) -> &'static str,
    libraries: &'static [(&'static str, &'static str)],
    ctor: fn(&DeployParameters) -> Vec<u8>,
    post_deploy: Option<fn(&DeployParameters) -> Vec<u8>>,
    use_gas_override: bool,
}

impl Create2Stage {
    fn plain(name: &'static str, artifact: fn(&DeployParameters) -> &'static str) -> Self {
        Create2Stage {
            name,
            artifact,
            libraries: &[],
            ctor: |_| Vec::new(),
            post_deploy: None,
            use_gas_override: false,
        }
    }
}

#[async_trait]
impl Stage for Create2Stage {
    fn name(&self) -> &str {
        self.name
    }

    fn requires(&self) -> Vec<String> {
        let mut required = vec![ZKEVM_DEPLOYER.to_string()];
        required.extend(self.libraries.iter().map(|(key, _)| key.to_string()));
        required
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        let libraries = ctx.libraries(self.libraries)?;
        let artifact = (self.artifact)(ctx.params);
        let ctor_args = (self.ctor)(ctx.params);
        let init_code = ctx.artifacts.init_code(artifact, &libraries, &ctor_args)?;

        let post_deploy_call = self.post_deploy.map(|f| f(ctx.params));
        let gas_limit = if self.use_gas_override {
            ctx.params.deploy_gas_limit
        } else {
            None
        };

        let (addr, newly_created) = ctx
            .deployer()?
            .deploy_or_attach(ctx.params.salt, init_code, post_deploy_call, gas_limit)
            .await?;
        if newly_created {
            info!("{} deployed to: {addr}", self.name);
        } else {
            info!("{} already deployed on: {addr}", self.name);
        }

        ctx.record(self.name, addr)
    }
}

/// Predicts the proxy address of every instance component before the spawn
/// call exists on chain. Produces only checkpoint entries, no transactions.
struct PredictInstanceStage;

impl PredictInstanceStage {
    async fn predict(
        &self,
        ctx: &StageContext<'_>,
        component: &str,
    ) -> OrchestratorResult<Address> {
        // the forking manager implementation doubles as the spawner
        let spawner = ctx.address(FORKING_MANAGER)?;
        let proxy_admin = ctx.address(PROXY_ADMIN)?;
        let logic = ctx.address(component)?;

        let proxy_code = ctx
            .artifacts
            .load(PROXY_ARTIFACT)?
            .linked_bytecode(&Default::default())?;

        Ok(predict_transparent_proxy_address(
            spawner,
            logic,
            proxy_admin,
            ctx.client.sender(),
            &proxy_code,
        ))
    }
}

#[async_trait]
impl Stage for PredictInstanceStage {
    fn name(&self) -> &str {
        "predictedProxies"
    }

    fn outputs(&self) -> Vec<String> {
        PROXIED_COMPONENTS.iter().map(|c| predicted(c)).collect()
    }

    fn requires(&self) -> Vec<String> {
        let mut required: Vec<String> =
            PROXIED_COMPONENTS.iter().map(|c| c.to_string()).collect();
        required.push(PROXY_ADMIN.to_string());
        required
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        for component in PROXIED_COMPONENTS {
            let addr = self.predict(ctx, component).await?;
            info!("Predicted proxy for {component}: {addr}");
            ctx.record(&predicted(component), addr)?;
        }
        Ok(())
    }

    /// Predictions are not contracts yet, so instead of a code check the
    /// sanity check recomputes them: a drifted salt, library address or
    /// bytecode would silently change every downstream address.
    async fn attach(&self, ctx: &mut StageContext<'_>) -> OrchestratorResult<()> {
        for component in PROXIED_COMPONENTS {
            let name = predicted(component);
            let recorded = ctx.address(&name)?;
            let recomputed = self.predict(ctx, component).await?;
            if recorded != recomputed {
                return Err(OrchestratorError::PredictionMismatch {
                    name,
                    predicted: recomputed,
                    observed: recorded,
                });
            }
        }
        Ok(())
    }
}

fn verifier_artifact(params: &DeployParameters) -> &'static str {
    if params.real_verifier {
        "FflonkVerifier"
    } else {
        "VerifierRollupHelperMock"
    }
}

/// The full base deployment, in dependency order.
pub fn base_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ZkEvmDeployerStage),
        Box::new(Create2Stage {
            use_gas_override: true,
            ..Create2Stage::plain(CREATE_CHILDREN, |_| "CreateChildren")
        }),
        Box::new(Create2Stage::plain(BRIDGE_ASSET_OPERATIONS, |_| {
            "BridgeAssetOperations"
        })),
        Box::new(Create2Stage {
            libraries: &[
                (CREATE_CHILDREN, "CreateChildren"),
                (BRIDGE_ASSET_OPERATIONS, "BridgeAssetOperations"),
            ],
            use_gas_override: true,
            ..Create2Stage::plain(FORKABLE_BRIDGE, |_| "ForkableBridge")
        }),
        Box::new(Create2Stage {
            libraries: &[(CREATE_CHILDREN, "CreateChildren")],
            use_gas_override: true,
            ..Create2Stage::plain(FORKONOMIC_TOKEN, |_| "ForkonomicToken")
        }),
        Box::new(Create2Stage {
            ctor: |params| U256::from(params.chain_id).abi_encode(),
            ..Create2Stage::plain(CHAIN_ID_MANAGER, |_| "ChainIdManager")
        }),
        Box::new(Create2Stage::plain(VERIFIER_CONTRACT, verifier_artifact)),
        Box::new(Create2Stage {
            libraries: &[(CREATE_CHILDREN, "CreateChildren")],
            use_gas_override: true,
            ..Create2Stage::plain(FORKABLE_ZKEVM, |_| "ForkableZkEVM")
        }),
        Box::new(Create2Stage {
            libraries: &[(CREATE_CHILDREN, "CreateChildren")],
            use_gas_override: true,
            ..Create2Stage::plain(FORKABLE_GLOBAL_EXIT_ROOT, |_| "ForkableGlobalExitRoot")
        }),
        Box::new(Create2Stage {
            libraries: &[(CREATE_CHILDREN, "CreateChildren")],
            use_gas_override: true,
            ..Create2Stage::plain(FORKING_MANAGER, |_| "ForkingManager")
        }),
        // do not initialize the proxy admin through the proxy: transfer
        // ownership in the same deployment step instead
        Box::new(Create2Stage {
            post_deploy: Some(|params| {
                IProxyAdmin::transferOwnershipCall {
                    newOwner: params.admin,
                }
                .abi_encode()
            }),
            use_gas_override: true,
            ..Create2Stage::plain(PROXY_ADMIN, |_| "ProxyAdmin")
        }),
        Box::new(PredictInstanceStage),
    ]
}
