//! Application-layer contracts on top of the base stack: the L1 chain-info
//! publisher and fork requester, the L2 chain-info contract, and the
//! chain-info update that pushes L2 coordinates through the bridge. These
//! are plain deployments, resumable through the same checkpoint store as the
//! create2 stages.

use std::collections::HashMap;

use alloy::network::TransactionBuilder;
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolValue;
use log::info;
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactStore;
use crate::checkpoint::CheckpointStore;
use crate::contracts::IL1GlobalChainInfoPublisher;
use crate::domain::{execute_contract_call, ChainClient};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::output::DeploymentOutput;

pub const L1_GLOBAL_CHAIN_INFO_PUBLISHER: &str = "l1GlobalChainInfoPublisher";
pub const L1_GLOBAL_FORK_REQUESTER: &str = "l1GlobalForkRequester";
pub const L2_CHAIN_INFO: &str = "l2ChainInfo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Applications {
    pub l1_global_chain_info_publisher: Address,
    pub l1_global_fork_requester: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Applications {
    pub l2_chain_info: Address,
}

/// Plain (non-create2) checkpointed deployment: attach to an externally
/// supplied or previously recorded address, otherwise deploy and record
/// before returning.
pub async fn load_ongoing_or_deploy(
    client: &dyn ChainClient,
    store: &mut dyn CheckpointStore,
    artifacts: &ArtifactStore,
    name: &str,
    artifact: &str,
    ctor_args: &[u8],
    externally_deployed: Option<Address>,
) -> OrchestratorResult<Address> {
    if let Some(addr) = externally_deployed {
        info!("{name} already deployed on: {addr}");
        return Ok(addr);
    }
    if let Some(addr) = store.get(name) {
        info!("{name} already deployed on: {addr}");
        return Ok(addr);
    }

    let init_code = artifacts.init_code(artifact, &HashMap::new(), ctor_args)?;
    let outcome = client
        .send_transaction(TransactionRequest::default().with_deploy_code(init_code))
        .await?;
    if !outcome.success {
        return Err(OrchestratorError::TransactionReverted(
            outcome.tx_hash.to_string(),
        ));
    }
    let addr = outcome
        .contract_address
        .ok_or(OrchestratorError::generic_err(
            "deployment receipt carries no contract address",
        ))?;

    store.set(name, addr)?;
    info!("{name} deployed to: {addr}");
    Ok(addr)
}

pub async fn deploy_l1_applications(
    client: &dyn ChainClient,
    store: &mut dyn CheckpointStore,
    artifacts: &ArtifactStore,
) -> OrchestratorResult<L1Applications> {
    let l1_global_chain_info_publisher = load_ongoing_or_deploy(
        client,
        store,
        artifacts,
        L1_GLOBAL_CHAIN_INFO_PUBLISHER,
        "L1GlobalChainInfoPublisher",
        &[],
        None,
    )
    .await?;
    let l1_global_fork_requester = load_ongoing_or_deploy(
        client,
        store,
        artifacts,
        L1_GLOBAL_FORK_REQUESTER,
        "L1GlobalForkRequester",
        &[],
        None,
    )
    .await?;

    Ok(L1Applications {
        l1_global_chain_info_publisher,
        l1_global_fork_requester,
    })
}

/// The L2 side needs the L1 application addresses first; the L2 bridge
/// address comes out of the genesis of the spawned instance.
pub async fn deploy_l2_applications(
    client: &dyn ChainClient,
    store: &mut dyn CheckpointStore,
    artifacts: &ArtifactStore,
    l1_applications: &L1Applications,
    l2_bridge: Address,
) -> OrchestratorResult<L2Applications> {
    let ctor_args = (
        l2_bridge,
        l1_applications.l1_global_chain_info_publisher,
    )
        .abi_encode_params();

    let l2_chain_info = load_ongoing_or_deploy(
        client,
        store,
        artifacts,
        L2_CHAIN_INFO,
        "L2ChainInfo",
        &ctor_args,
        None,
    )
    .await?;

    Ok(L2Applications { l2_chain_info })
}

/// Push the L2 chain info through the bridge so L1 consumers can read it.
pub async fn update_l2_chain_info(
    client: &dyn ChainClient,
    l1_system: &DeploymentOutput,
    l1_applications: &L1Applications,
    l2_applications: &L2Applications,
) -> OrchestratorResult<()> {
    info!(
        "sending chain info update with addresses {} {}",
        l1_system.bridge_address, l2_applications.l2_chain_info
    );

    let call = IL1GlobalChainInfoPublisher::updateL2ChainInfoCall {
        bridge: l1_system.bridge_address,
        l2ChainInfo: l2_applications.l2_chain_info,
        gasTokenAddress: Address::ZERO,
        gasTokenNetwork: Address::ZERO,
    };
    let outcome = execute_contract_call(
        client,
        l1_applications.l1_global_chain_info_publisher,
        &call,
        None,
    )
    .await?;
    info!("sent tx, hash is {}", outcome.tx_hash);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::mock_chain::MockChain;

    fn artifact_dir(tag: &str) -> std::path::PathBuf {
        let dir =
            std::env::temp_dir().join(format!("backstop_apps_{tag}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, tag) in [
            ("L1GlobalChainInfoPublisher", "01"),
            ("L1GlobalForkRequester", "02"),
            ("L2ChainInfo", "03"),
        ] {
            std::fs::write(
                dir.join(format!("{name}.json")),
                format!(
                    r#"{{"contractName": "{name}", "bytecode": "0x60{tag}600a", "linkReferences": {{}}}}"#
                ),
            )
            .unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_load_ongoing_or_deploy_is_resumable() {
        let chain = MockChain::new();
        let mut store = MemoryCheckpointStore::new();
        let artifacts = ArtifactStore::new(artifact_dir("l1"));

        let first = deploy_l1_applications(&chain, &mut store, &artifacts)
            .await
            .unwrap();
        let sent = chain.sent_count();
        assert_eq!(sent, 2);

        // a rerun attaches to the recorded addresses
        let second = deploy_l1_applications(&chain, &mut store, &artifacts)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(chain.sent_count(), sent);
    }

    #[tokio::test]
    async fn test_l2_application_links_l1_publisher() {
        let chain = MockChain::new();
        let mut store = MemoryCheckpointStore::new();
        let artifacts = ArtifactStore::new(artifact_dir("l2"));

        let l1_applications = L1Applications {
            l1_global_chain_info_publisher: Address::repeat_byte(0x01),
            l1_global_fork_requester: Address::repeat_byte(0x02),
        };
        let l2_bridge = Address::repeat_byte(0x03);

        let l2_applications = deploy_l2_applications(
            &chain,
            &mut store,
            &artifacts,
            &l1_applications,
            l2_bridge,
        )
        .await
        .unwrap();

        assert_ne!(l2_applications.l2_chain_info, Address::ZERO);
        // constructor arguments ride along in the deployment input
        let sent = chain.sent();
        let input = sent[0].input.input().unwrap();
        let tail = &input[input.len() - 64..];
        assert_eq!(&tail[12..32], l2_bridge.as_slice());
        assert_eq!(
            &tail[44..64],
            l1_applications.l1_global_chain_info_publisher.as_slice()
        );
    }
}
