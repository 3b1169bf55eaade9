#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use alloy::primitives::{b256, keccak256, Address, Bytes, B256, U256};
    use alloy::sol_types::{SolCall, SolValue};
    use async_trait::async_trait;
    use serde_json::json;

    use crate::artifacts::ArtifactStore;
    use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
    use crate::claims::{
        ClaimError, ClaimResolver, ClaimResult, DepositApi, DepositRecord, MerkleProof,
    };
    use crate::config::DeployParameters;
    use crate::contracts::{
        DisputeData, IForkableBridge, IForkableZkEvm, IForkingManager, IForkonomicToken,
        IStackDeployer,
    };
    use crate::deployer::Create2Deployer;
    use crate::domain::ChainClient;
    use crate::error::OrchestratorError;
    use crate::fork::{ForkDriver, ForkState};
    use crate::mock_chain::MockChain;
    use crate::output::{GeneratedAddresses, InstanceRecord};
    use crate::retry::RetryPolicy;
    use crate::spawn::InstanceSpawner;
    use crate::stages;
    use crate::{deploy_base, spawn_instance};

    const GENESIS_ROOT: B256 =
        b256!("4f2a4b21d87b6d5a4c2e7ad12ca9df64c37db6cdbc5dc8e206c9f49cd52ed1b5");

    fn params() -> DeployParameters {
        DeployParameters::from_value(json!({
            "realVerifier": false,
            "trustedSequencerURL": "http://zkevm-json-rpc:8123",
            "networkName": "backstop",
            "version": "0.0.1",
            "forkPreparationTime": 3600,
            "trustedSequencer": "0x617b3a3528F9cDd6630fd3301B9c8911F7Bf063D",
            "chainID": 1101,
            "admin": "0x2ECcc836B2A8E5B4f0ed8e1092E48354B859E859",
            "minter": "0x617b3a3528F9cDd6630fd3301B9c8911F7Bf063D",
            "trustedAggregator": "0x617b3a3528F9cDd6630fd3301B9c8911F7Bf063D",
            "trustedAggregatorTimeout": 604799,
            "pendingStateTimeout": 604799,
            "forkID": 6,
            "salt": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "hardAssetManagerAddress": "0x617b3a3528F9cDd6630fd3301B9c8911F7Bf063D",
            "arbitrationFee": "1000000000000000000",
            "tokenName": "Backstop0",
            "tokenSymbol": "BOP0",
            "deployGasLimit": 6500000u64
        }))
        .unwrap()
    }

    /// `__$` + 34 filler chars + `$__`: the 40-hex-char placeholder hardhat
    /// leaves where a 20 byte library address belongs.
    fn placeholder(tag: char) -> String {
        format!("__${}$__", tag.to_string().repeat(34))
    }

    fn plain_artifact(name: &str, tag: u8) -> serde_json::Value {
        json!({
            "contractName": name,
            "bytecode": format!("0x60{tag:02x}600a"),
            "linkReferences": {}
        })
    }

    fn linked_artifact(name: &str, tag: u8, libraries: &[&str]) -> serde_json::Value {
        let mut bytecode = format!("0x60{tag:02x}");
        let mut refs = serde_json::Map::new();
        for (i, lib) in libraries.iter().enumerate() {
            bytecode.push_str(&placeholder(char::from(b'a' + i as u8)));
            refs.insert(
                lib.to_string(),
                json!([{ "start": 2 + i * 20, "length": 20 }]),
            );
        }
        bytecode.push_str("00");
        json!({
            "contractName": name,
            "bytecode": bytecode,
            "linkReferences": { "contracts/lib.sol": refs }
        })
    }

    fn write_artifacts(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "backstop_artifacts_{tag}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let artifacts = vec![
            plain_artifact("ZkEvmDeployer", 0x01),
            plain_artifact("CreateChildren", 0x02),
            plain_artifact("BridgeAssetOperations", 0x03),
            linked_artifact(
                "ForkableBridge",
                0x04,
                &["CreateChildren", "BridgeAssetOperations"],
            ),
            linked_artifact("ForkonomicToken", 0x05, &["CreateChildren"]),
            plain_artifact("ChainIdManager", 0x06),
            plain_artifact("VerifierRollupHelperMock", 0x07),
            plain_artifact("FflonkVerifier", 0x08),
            linked_artifact("ForkableZkEVM", 0x09, &["CreateChildren"]),
            linked_artifact("ForkableGlobalExitRoot", 0x0a, &["CreateChildren"]),
            linked_artifact("ForkingManager", 0x0b, &["CreateChildren"]),
            plain_artifact("ProxyAdmin", 0x0c),
            plain_artifact("TransparentUpgradeableProxy", 0x0d),
            plain_artifact("L1GlobalChainInfoPublisher", 0x0e),
            plain_artifact("L1GlobalForkRequester", 0x0f),
            plain_artifact("L2ChainInfo", 0x10),
        ];
        for artifact in artifacts {
            let name = artifact["contractName"].as_str().unwrap().to_string();
            std::fs::write(
                dir.join(format!("{name}.json")),
                serde_json::to_string_pretty(&artifact).unwrap(),
            )
            .unwrap();
        }
        dir
    }

    /// The address the mock chain assigns to the first plain CREATE, i.e.
    /// the stack deployer.
    fn first_created_address(chain: &MockChain) -> Address {
        Address::from_slice(&keccak256((chain.sender(), 1u64).abi_encode())[12..])
    }

    fn script_deployer_owner(chain: &MockChain) {
        let deployer = first_created_address(chain);
        chain.respond_with(deployer, IStackDeployer::ownerCall::SELECTOR, chain.sender());
    }

    // ---------------------------------------------------------------------
    // base deployment pipeline

    #[tokio::test]
    async fn test_deploy_base_records_every_stage() {
        let dir = write_artifacts("full");
        let artifacts = ArtifactStore::new(&dir);
        let chain = MockChain::new();
        let mut store = MemoryCheckpointStore::new();
        script_deployer_owner(&chain);

        let generated = deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap();

        // one plain create plus ten create2 deployments
        assert_eq!(chain.sent_count(), 11);
        assert_eq!(generated.zk_evm_deployer, first_created_address(&chain));
        assert_ne!(generated.create_children, Address::ZERO);
        assert_ne!(generated.forkable_zk_evm_predicted, Address::ZERO);

        // the proxy admin is the one deployment carrying a post-deploy call
        assert_eq!(
            chain.sent_with_selector(IStackDeployer::deployDeterministicAndCallCall::SELECTOR),
            1
        );
        assert_eq!(
            chain.sent_with_selector(IStackDeployer::deployDeterministicCall::SELECTOR),
            9
        );
    }

    #[tokio::test]
    async fn test_rerun_makes_no_new_transactions() {
        let dir = write_artifacts("rerun");
        let artifacts = ArtifactStore::new(&dir);
        let chain = MockChain::new();
        let mut store = MemoryCheckpointStore::new();
        script_deployer_owner(&chain);

        let first = deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap();
        let sent_after_first = chain.sent_count();

        let second = deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(chain.sent_count(), sent_after_first);
    }

    #[tokio::test]
    async fn test_resume_after_lost_checkpoint_attaches_instead_of_redeploying() {
        // a run interrupted after the transactions confirmed but before the
        // checkpoint was written: the chain has the code, the store does not
        let dir = write_artifacts("lost");
        let artifacts = ArtifactStore::new(&dir);
        let chain = MockChain::new();
        let mut store = MemoryCheckpointStore::new();
        script_deployer_owner(&chain);

        let generated = deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap();
        let sent_after_first = chain.sent_count();

        let mut partial = MemoryCheckpointStore::new();
        partial
            .set(stages::ZKEVM_DEPLOYER, generated.zk_evm_deployer)
            .unwrap();
        partial
            .set(stages::CREATE_CHILDREN, generated.create_children)
            .unwrap();

        let resumed = deploy_base(&chain, &params(), &artifacts, &mut partial)
            .await
            .unwrap();

        // the predicted-address code check attaches to every existing
        // deployment; not a single new transaction is needed
        assert_eq!(resumed, generated);
        assert_eq!(chain.sent_count(), sent_after_first);
    }

    #[tokio::test]
    async fn test_resume_continues_after_checkpointed_stages() {
        // checkpoint reflects the first stages of an earlier run against a
        // chain we now see fresh code-wise for the remaining stages
        let dir = write_artifacts("resume");
        let artifacts = ArtifactStore::new(&dir);
        let chain = MockChain::new();
        script_deployer_owner(&chain);

        let deployer_addr = first_created_address(&chain);
        let create_children = Address::repeat_byte(0x21);
        let bridge_ops = Address::repeat_byte(0x22);

        let mut store = MemoryCheckpointStore::new();
        store.set(stages::ZKEVM_DEPLOYER, deployer_addr).unwrap();
        store.set(stages::CREATE_CHILDREN, create_children).unwrap();
        store
            .set(stages::BRIDGE_ASSET_OPERATIONS, bridge_ops)
            .unwrap();

        // those three already hold code on chain
        chain.set_code(deployer_addr, Bytes::from_static(&[0x01]));
        chain.set_code(create_children, Bytes::from_static(&[0x02]));
        chain.set_code(bridge_ops, Bytes::from_static(&[0x03]));

        deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap();

        // stages 1..3 untouched: no plain create, only the seven remaining
        // plain create2 stages plus the proxy admin call variant ran
        assert_eq!(
            chain.sent_with_selector(IStackDeployer::deployDeterministicCall::SELECTOR),
            7
        );
        assert_eq!(
            chain.sent_with_selector(IStackDeployer::deployDeterministicAndCallCall::SELECTOR),
            1
        );
        assert_eq!(chain.sent_count(), 8);
    }

    #[tokio::test]
    async fn test_checkpointed_address_without_code_fails_fast() {
        let dir = write_artifacts("nocode");
        let artifacts = ArtifactStore::new(&dir);
        let chain = MockChain::new();
        script_deployer_owner(&chain);

        let deployer_addr = first_created_address(&chain);
        chain.set_code(deployer_addr, Bytes::from_static(&[0x01]));

        let mut store = MemoryCheckpointStore::new();
        store.set(stages::ZKEVM_DEPLOYER, deployer_addr).unwrap();
        // checkpointed, but nothing on chain
        store
            .set(stages::CREATE_CHILDREN, Address::repeat_byte(0x66))
            .unwrap();

        let err = deploy_base(&chain, &params(), &artifacts, &mut store)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::CheckpointedCodeMissing(name, _) if name == stages::CREATE_CHILDREN
        ));
    }

    // ---------------------------------------------------------------------
    // deterministic deployer

    #[tokio::test]
    async fn test_deploy_or_attach_is_idempotent() {
        let chain = MockChain::new();
        let stack_deployer = Address::repeat_byte(0x44);
        let deployer = Create2Deployer::new(&chain, stack_deployer, RetryPolicy::none());

        let salt = params().salt;
        let init_code = vec![0x60, 0x02, 0x60, 0x0a];

        let (addr_1, created_1) = deployer
            .deploy_or_attach(salt, init_code.clone(), None, None)
            .await
            .unwrap();
        assert!(created_1);
        assert_eq!(chain.sent_count(), 1);

        // second invocation: same address, zero state-changing calls
        let (addr_2, created_2) = deployer
            .deploy_or_attach(salt, init_code, None, None)
            .await
            .unwrap();
        assert_eq!(addr_1, addr_2);
        assert!(!created_2);
        assert_eq!(chain.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_deploy_or_attach_retries_transient_failures() {
        let chain = MockChain::new();
        chain.fail_next_sends(2);

        let stack_deployer = Address::repeat_byte(0x44);
        let deployer = Create2Deployer::new(
            &chain,
            stack_deployer,
            RetryPolicy::new(5, Duration::ZERO),
        );

        let (_, created) = deployer
            .deploy_or_attach(params().salt, vec![0x60, 0x01], None, Some(6_500_000))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(chain.sent_count(), 1);
    }

    // ---------------------------------------------------------------------
    // instance spawner

    fn generated_fixture() -> GeneratedAddresses {
        GeneratedAddresses {
            zk_evm_deployer: Address::repeat_byte(0x01),
            create_children: Address::repeat_byte(0x02),
            bridge_asset_operations: Address::repeat_byte(0x03),
            forkable_bridge: Address::repeat_byte(0x04),
            forkonomic_token: Address::repeat_byte(0x05),
            chain_id_manager: Address::repeat_byte(0x06),
            verifier_contract: Address::repeat_byte(0x07),
            forkable_zk_evm: Address::repeat_byte(0x08),
            forkable_global_exit_root: Address::repeat_byte(0x09),
            forking_manager: Address::repeat_byte(0x0a),
            proxy_admin: Address::repeat_byte(0x0b),
            forkable_zk_evm_predicted: Address::repeat_byte(0xa1),
            forkable_bridge_predicted: Address::repeat_byte(0xa2),
            forkable_global_exit_root_predicted: Address::repeat_byte(0xa3),
            forking_manager_predicted: Address::repeat_byte(0xa4),
            forkonomic_token_predicted: Address::repeat_byte(0xa5),
        }
    }

    fn script_spawn_wiring(chain: &MockChain, generated: &GeneratedAddresses) {
        let manager = generated.forking_manager_predicted;
        chain.respond_with(
            manager,
            IForkingManager::zkEVMCall::SELECTOR,
            generated.forkable_zk_evm_predicted,
        );
        chain.respond_with(
            manager,
            IForkingManager::bridgeCall::SELECTOR,
            generated.forkable_bridge_predicted,
        );
        chain.respond_with(
            manager,
            IForkingManager::forkonomicTokenCall::SELECTOR,
            generated.forkonomic_token_predicted,
        );
        chain.respond_with(
            manager,
            IForkingManager::globalExitRootCall::SELECTOR,
            generated.forkable_global_exit_root_predicted,
        );
    }

    #[tokio::test]
    async fn test_spawn_instance_postconditions_hold() {
        let chain = MockChain::new();
        let generated = generated_fixture();

        // the spawn call atomically creates all five proxies
        chain.set_code_on_send(
            IForkingManager::spawnInstanceCall::SELECTOR,
            vec![
                (generated.forkable_zk_evm_predicted, Bytes::from_static(&[1])),
                (generated.forkable_bridge_predicted, Bytes::from_static(&[1])),
                (
                    generated.forkable_global_exit_root_predicted,
                    Bytes::from_static(&[1]),
                ),
                (generated.forking_manager_predicted, Bytes::from_static(&[1])),
                (generated.forkonomic_token_predicted, Bytes::from_static(&[1])),
            ],
        );
        script_spawn_wiring(&chain, &generated);

        let output = spawn_instance(&chain, &params(), &generated, GENESIS_ROOT)
            .await
            .unwrap();

        assert_eq!(
            chain.sent_with_selector(IForkingManager::spawnInstanceCall::SELECTOR),
            1
        );
        assert_eq!(output.zk_evm_address, generated.forkable_zk_evm_predicted);
        assert_eq!(output.genesis_root, GENESIS_ROOT);
        assert!(output.deployment_block_number >= 0);

        let record = output.instance_record();
        assert_eq!(record.forking_manager, generated.forking_manager_predicted);
        assert_eq!(record.chain_id, 1101);
    }

    #[tokio::test]
    async fn test_spawn_is_skipped_when_code_exists_at_prediction() {
        let chain = MockChain::new();
        let generated = generated_fixture();

        for addr in [
            generated.forkable_zk_evm_predicted,
            generated.forkable_bridge_predicted,
            generated.forkable_global_exit_root_predicted,
            generated.forking_manager_predicted,
            generated.forkonomic_token_predicted,
        ] {
            chain.set_code(addr, Bytes::from_static(&[1]));
        }
        script_spawn_wiring(&chain, &generated);

        let output = spawn_instance(&chain, &params(), &generated, GENESIS_ROOT)
            .await
            .unwrap();

        assert_eq!(
            chain.sent_with_selector(IForkingManager::spawnInstanceCall::SELECTOR),
            0
        );
        assert_eq!(output.deployment_block_number, -1);
    }

    #[tokio::test]
    async fn test_spawn_wiring_mismatch_is_fatal() {
        let chain = MockChain::new();
        let generated = generated_fixture();

        chain.set_code_on_send(
            IForkingManager::spawnInstanceCall::SELECTOR,
            vec![
                (generated.forkable_zk_evm_predicted, Bytes::from_static(&[1])),
                (generated.forkable_bridge_predicted, Bytes::from_static(&[1])),
                (
                    generated.forkable_global_exit_root_predicted,
                    Bytes::from_static(&[1]),
                ),
                (generated.forking_manager_predicted, Bytes::from_static(&[1])),
                (generated.forkonomic_token_predicted, Bytes::from_static(&[1])),
            ],
        );
        // the manager reports a wrong rollup address after the spawn
        let manager = generated.forking_manager_predicted;
        chain.respond_with(
            manager,
            IForkingManager::zkEVMCall::SELECTOR,
            Address::repeat_byte(0xff),
        );
        chain.respond_with(
            manager,
            IForkingManager::bridgeCall::SELECTOR,
            generated.forkable_bridge_predicted,
        );
        chain.respond_with(
            manager,
            IForkingManager::forkonomicTokenCall::SELECTOR,
            generated.forkonomic_token_predicted,
        );
        chain.respond_with(
            manager,
            IForkingManager::globalExitRootCall::SELECTOR,
            generated.forkable_global_exit_root_predicted,
        );

        let spawner = InstanceSpawner::new(&chain).with_retry(RetryPolicy::none());
        let err = spawner
            .spawn_instance(&generated, GENESIS_ROOT, &params())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::PredictionMismatch { .. }
                | OrchestratorError::NoCodeAtPredicted(_, _)
        ));
    }

    // ---------------------------------------------------------------------
    // fork protocol driver

    fn dispute() -> DisputeData {
        DisputeData {
            disputeContract: Address::repeat_byte(0x77),
            disputeContent: keccak256(b"is the sequencer censoring?"),
            isL1: false,
        }
    }

    fn fork_driver_fixture() -> (Address, Address) {
        let manager = Address::repeat_byte(0x31);
        let token = Address::repeat_byte(0x32);
        (manager, token)
    }

    #[tokio::test]
    async fn test_initiate_fork_pays_fee_and_submits() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();

        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::ZERO, Address::ZERO),
        );
        chain.respond_with(
            manager,
            IForkingManager::reservedChainIdForFork1Call::SELECTOR,
            0u64,
        );
        chain.respond_with(
            manager,
            IForkingManager::arbitrationFeeCall::SELECTOR,
            U256::from(1000),
        );
        chain.respond_with(
            token,
            IForkonomicToken::balanceOfCall::SELECTOR,
            U256::from(2000),
        );

        let driver = ForkDriver::new(&chain, manager, token);
        assert_eq!(driver.state().await.unwrap(), ForkState::Idle);

        driver.initiate_fork(dispute()).await.unwrap();

        assert_eq!(
            chain.sent_with_selector(IForkonomicToken::approveCall::SELECTOR),
            1
        );
        assert_eq!(
            chain.sent_with_selector(IForkingManager::initiateForkCall::SELECTOR),
            1
        );
    }

    #[tokio::test]
    async fn test_initiate_fork_rejected_while_proposal_pending() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();

        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::ZERO, Address::ZERO),
        );
        // a reserved child chain id is already non-zero
        chain.respond_with(
            manager,
            IForkingManager::reservedChainIdForFork1Call::SELECTOR,
            1102u64,
        );

        let driver = ForkDriver::new(&chain, manager, token);
        let err = driver.initiate_fork(dispute()).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::ForkAlreadyProposed));
        assert_eq!(
            chain.sent_with_selector(IForkingManager::initiateForkCall::SELECTOR),
            0
        );
    }

    #[tokio::test]
    async fn test_initiate_fork_requires_fee_balance() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();

        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::ZERO, Address::ZERO),
        );
        chain.respond_with(
            manager,
            IForkingManager::reservedChainIdForFork1Call::SELECTOR,
            0u64,
        );
        chain.respond_with(
            manager,
            IForkingManager::arbitrationFeeCall::SELECTOR,
            U256::from(1000),
        );
        chain.respond_with(
            token,
            IForkonomicToken::balanceOfCall::SELECTOR,
            U256::from(10),
        );

        let driver = ForkDriver::new(&chain, manager, token);
        let err = driver.initiate_fork(dispute()).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::Precondition(_)));
    }

    fn parent_record(manager: Address, token: Address) -> InstanceRecord {
        InstanceRecord {
            zk_evm: Address::repeat_byte(0x41),
            bridge: Address::repeat_byte(0x42),
            global_exit_root: Address::repeat_byte(0x43),
            forking_manager: manager,
            forkonomic_token: token,
            chain_id: 1101,
            genesis_root: GENESIS_ROOT,
        }
    }

    fn script_child(chain: &MockChain, manager: Address, tag: u8, chain_id: u64) {
        let zk_evm = Address::repeat_byte(tag);
        chain.respond_with(manager, IForkingManager::zkEVMCall::SELECTOR, zk_evm);
        chain.respond_with(
            manager,
            IForkingManager::bridgeCall::SELECTOR,
            Address::repeat_byte(tag + 1),
        );
        chain.respond_with(
            manager,
            IForkingManager::forkonomicTokenCall::SELECTOR,
            Address::repeat_byte(tag + 2),
        );
        chain.respond_with(
            manager,
            IForkingManager::globalExitRootCall::SELECTOR,
            Address::repeat_byte(tag + 3),
        );
        chain.respond_with(zk_evm, IForkableZkEvm::chainIDCall::SELECTOR, chain_id);
    }

    #[tokio::test]
    async fn test_execute_fork_waits_for_deadline_then_splits() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();
        let child_one = Address::repeat_byte(0x51);
        let child_two = Address::repeat_byte(0x61);

        // state check sees no children yet; the post-execution read returns them
        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::ZERO, Address::ZERO),
        );
        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (child_one, child_two),
        );
        chain.respond_with(
            manager,
            IForkingManager::reservedChainIdForFork1Call::SELECTOR,
            1102u64,
        );
        chain.respond_with(
            manager,
            IForkingManager::executionTimeForProposalCall::SELECTOR,
            U256::from(10_000),
        );
        script_child(&chain, child_one, 0x51, 1102);
        script_child(&chain, child_two, 0x61, 1103);

        // the preparation period is still running; the driver polls the
        // chain clock instead of erroring out
        chain.set_timestamp(9_000);
        chain.set_auto_advance(600);

        let driver =
            ForkDriver::new(&chain, manager, token).with_poll_backoff(Duration::ZERO);
        let (record_one, record_two) = driver
            .execute_fork(&parent_record(manager, token))
            .await
            .unwrap();

        assert_eq!(
            chain.sent_with_selector(IForkingManager::executeForkCall::SELECTOR),
            1
        );
        assert_eq!(record_one.forking_manager, child_one);
        assert_eq!(record_two.forking_manager, child_two);
        assert_eq!(record_one.chain_id, 1102);
        assert_eq!(record_two.chain_id, 1103);
        // children inherit the pre-fork history
        assert_eq!(record_one.genesis_root, GENESIS_ROOT);
        assert_eq!(record_two.genesis_root, GENESIS_ROOT);
    }

    #[tokio::test]
    async fn test_execute_fork_fails_cleanly_twice() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();

        // children already exist: the fork executed before
        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::repeat_byte(0x51), Address::repeat_byte(0x61)),
        );

        let driver = ForkDriver::new(&chain, manager, token);
        let err = driver
            .execute_fork(&parent_record(manager, token))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::ForkAlreadyExecuted));
        assert_eq!(
            chain.sent_with_selector(IForkingManager::executeForkCall::SELECTOR),
            0
        );
    }

    #[tokio::test]
    async fn test_execute_fork_without_proposal_fails() {
        let chain = MockChain::new();
        let (manager, token) = fork_driver_fixture();

        chain.respond_with(
            manager,
            IForkingManager::getChildrenCall::SELECTOR,
            (Address::ZERO, Address::ZERO),
        );
        chain.respond_with(
            manager,
            IForkingManager::reservedChainIdForFork1Call::SELECTOR,
            0u64,
        );

        let driver = ForkDriver::new(&chain, manager, token);
        let err = driver
            .execute_fork(&parent_record(manager, token))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::NoForkProposed));
    }

    // ---------------------------------------------------------------------
    // claim resolver

    struct MockDepositApi {
        deposit_pages: std::sync::Mutex<std::collections::VecDeque<Vec<DepositRecord>>>,
        proofs: HashMap<String, MerkleProof>,
        failing_proofs: Vec<String>,
    }

    impl MockDepositApi {
        fn new(pages: Vec<Vec<DepositRecord>>) -> Self {
            MockDepositApi {
                deposit_pages: std::sync::Mutex::new(pages.into_iter().collect()),
                proofs: HashMap::new(),
                failing_proofs: vec![],
            }
        }

        fn with_proof(mut self, deposit_cnt: &str) -> Self {
            self.proofs.insert(
                deposit_cnt.to_string(),
                MerkleProof {
                    merkle_proof: vec![B256::ZERO; 32],
                    main_exit_root: B256::ZERO,
                    rollup_exit_root: keccak256(b"rollup"),
                },
            );
            self
        }

        fn with_failing_proof(mut self, deposit_cnt: &str) -> Self {
            self.failing_proofs.push(deposit_cnt.to_string());
            self
        }
    }

    #[async_trait]
    impl DepositApi for MockDepositApi {
        async fn get_deposits(
            &self,
            _dest_addr: Address,
            _limit: u32,
            _offset: u32,
        ) -> ClaimResult<Vec<DepositRecord>> {
            let mut pages = self.deposit_pages.lock().unwrap();
            if pages.len() > 1 {
                Ok(pages.pop_front().unwrap())
            } else {
                Ok(pages.front().cloned().unwrap_or_default())
            }
        }

        async fn get_merkle_proof(
            &self,
            deposit_cnt: &str,
            _net_id: u32,
        ) -> ClaimResult<MerkleProof> {
            if self.failing_proofs.iter().any(|c| c == deposit_cnt) {
                return Err(ClaimError::Payload(format!(
                    "proof unavailable for {deposit_cnt}"
                )));
            }
            self.proofs
                .get(deposit_cnt)
                .cloned()
                .ok_or_else(|| ClaimError::Payload(format!("unknown deposit {deposit_cnt}")))
        }
    }

    fn claimable_deposit(deposit_cnt: &str, tx_hash: &str, leaf_type: u8) -> DepositRecord {
        serde_json::from_value(json!({
            "leaf_type": leaf_type,
            "orig_net": 0,
            "orig_addr": "0x0000000000000000000000000000000000000000",
            "dest_net": 1,
            "dest_addr": "0x30cEE8B78e4a1cbBfd5Bd7867531bcaBdb00d581",
            "amount": "10",
            "metadata": "0x",
            "deposit_cnt": deposit_cnt,
            "tx_hash": tx_hash,
            "claim_tx_hash": "",
            "ready_for_claim": true,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_wait_for_claimable_polls_until_nonempty() {
        let chain = MockChain::new();
        let bridge = Address::repeat_byte(0x81);
        let api = MockDepositApi::new(vec![
            vec![],
            vec![],
            vec![claimable_deposit("0", "0xd1", 0)],
        ]);

        let resolver = ClaimResolver::new(&chain, &api, bridge)
            .with_poll_backoff(Duration::ZERO);
        let claimable = resolver
            .wait_for_claimable(Address::repeat_byte(0x99))
            .await
            .unwrap();

        assert_eq!(claimable.len(), 1);
        assert_eq!(claimable[0].tx_hash, "0xd1");
    }

    #[tokio::test]
    async fn test_one_bad_claim_does_not_block_the_rest() {
        let chain = MockChain::new();
        let bridge = Address::repeat_byte(0x81);

        let deposits = vec![
            claimable_deposit("0", "0xd1", 0),
            claimable_deposit("1", "0xd2", 0),
            claimable_deposit("2", "0xd3", 1),
        ];
        let api = MockDepositApi::new(vec![deposits.clone()])
            .with_proof("0")
            .with_failing_proof("1")
            .with_proof("2");

        let resolver = ClaimResolver::new(&chain, &api, bridge)
            .with_poll_backoff(Duration::ZERO);
        let report = resolver.claim_all(&deposits).await;

        assert_eq!(report.claimed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "0xd2");

        // asset and message deposits go to their respective entry points
        assert_eq!(
            chain.sent_with_selector(IForkableBridge::claimAssetCall::SELECTOR),
            1
        );
        assert_eq!(
            chain.sent_with_selector(IForkableBridge::claimMessageCall::SELECTOR),
            1
        );
    }
}
