//! Two-phase fork of a running instance: initiate locks in the dispute
//! reason and collects the fee, execute (after the preparation delay)
//! instantiates two children and partitions balances and exit state between
//! them. Transitions are one-directional; there is no rollback.

use std::time::Duration;

use alloy::primitives::Address;
use log::info;
use tokio::time::sleep;

pub use crate::contracts::DisputeData;
use crate::contracts::{IForkableZkEvm, IForkingManager, IForkonomicToken};
use crate::domain::{query_contract, ChainClient};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::output::InstanceRecord;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ForkState {
    Idle,
    ForkProposed,
    ForkExecuted,
}

pub struct ForkDriver<'a> {
    client: &'a dyn ChainClient,
    pub forking_manager: Address,
    pub forkonomic_token: Address,
    retry: RetryPolicy,
    poll_backoff: Duration,
}

impl<'a> ForkDriver<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        forking_manager: Address,
        forkonomic_token: Address,
    ) -> Self {
        ForkDriver {
            client,
            forking_manager,
            forkonomic_token,
            retry: RetryPolicy::chain_default(),
            poll_backoff: Duration::from_secs(15),
        }
    }

    pub fn with_poll_backoff(mut self, poll_backoff: Duration) -> Self {
        self.poll_backoff = poll_backoff;
        self
    }

    /// Infer the protocol state from on-chain data rather than local
    /// bookkeeping: existing children mean the fork executed, a non-zero
    /// reserved child chain id means a proposal is pending.
    pub async fn state(&self) -> OrchestratorResult<ForkState> {
        let children = query_contract(
            self.client,
            self.forking_manager,
            IForkingManager::getChildrenCall {},
        )
        .await?;
        if children._0 != Address::ZERO || children._1 != Address::ZERO {
            return Ok(ForkState::ForkExecuted);
        }

        let reserved = query_contract(
            self.client,
            self.forking_manager,
            IForkingManager::reservedChainIdForFork1Call {},
        )
        .await?
        ._0;
        if reserved != 0 {
            return Ok(ForkState::ForkProposed);
        }

        Ok(ForkState::Idle)
    }

    /// Record the dispute, reserve the two child chain ids and start the
    /// preparation timer. Rejected when a proposal already exists.
    pub async fn initiate_fork(&self, dispute: DisputeData) -> OrchestratorResult<()> {
        match self.state().await? {
            ForkState::Idle => {}
            ForkState::ForkProposed => return Err(OrchestratorError::ForkAlreadyProposed),
            ForkState::ForkExecuted => return Err(OrchestratorError::ForkAlreadyExecuted),
        }

        let fee = query_contract(
            self.client,
            self.forking_manager,
            IForkingManager::arbitrationFeeCall {},
        )
        .await?
        ._0;
        let balance = query_contract(
            self.client,
            self.forkonomic_token,
            IForkonomicToken::balanceOfCall {
                account: self.client.sender(),
            },
        )
        .await?
        ._0;
        if balance < fee {
            return Err(OrchestratorError::Precondition(format!(
                "not enough tokens to pay the arbitration fee: have {balance}, need {fee}"
            )));
        }

        let approve = IForkonomicToken::approveCall {
            spender: self.forking_manager,
            amount: fee,
        };
        self.retry
            .submit(
                "approve_arbitration_fee",
                self.client,
                self.forkonomic_token,
                &approve,
                None,
            )
            .await?;

        let initiate = IForkingManager::initiateForkCall {
            disputeData: dispute,
        };
        let outcome = self
            .retry
            .submit(
                "initiate_fork",
                self.client,
                self.forking_manager,
                &initiate,
                None,
            )
            .await?;

        info!("Fork initiated with tx: {}", outcome.tx_hash);
        Ok(())
    }

    /// Execute a pending fork proposal. Called before the preparation
    /// deadline this polls chain time and retries instead of submitting a
    /// transaction destined to revert; after execution it assembles the two
    /// child instance records. Succeeds exactly once per proposal.
    pub async fn execute_fork(
        &self,
        parent: &InstanceRecord,
    ) -> OrchestratorResult<(InstanceRecord, InstanceRecord)> {
        match self.state().await? {
            ForkState::ForkProposed => {}
            ForkState::Idle => return Err(OrchestratorError::NoForkProposed),
            ForkState::ForkExecuted => return Err(OrchestratorError::ForkAlreadyExecuted),
        }

        let deadline = query_contract(
            self.client,
            self.forking_manager,
            IForkingManager::executionTimeForProposalCall {},
        )
        .await?
        ._0
        .to::<u64>();

        loop {
            let now = self.client.latest_timestamp().await?;
            if now >= deadline {
                break;
            }
            info!(
                "Fork preparation period not over ({}s left), retrying in {}s",
                deadline - now,
                self.poll_backoff.as_secs()
            );
            sleep(self.poll_backoff).await;
        }

        let execute = IForkingManager::executeForkCall {};
        let outcome = self
            .retry
            .submit("execute_fork", self.client, self.forking_manager, &execute, None)
            .await?;
        info!("Executed fork with tx: {}", outcome.tx_hash);

        let children = query_contract(
            self.client,
            self.forking_manager,
            IForkingManager::getChildrenCall {},
        )
        .await?;

        let child_one = self.child_record(children._0, parent).await?;
        let child_two = self.child_record(children._1, parent).await?;
        Ok((child_one, child_two))
    }

    /// Read one child's component wiring off its forking manager. Children
    /// inherit the pre-fork history, so the parent's genesis root carries
    /// over.
    async fn child_record(
        &self,
        manager: Address,
        parent: &InstanceRecord,
    ) -> OrchestratorResult<InstanceRecord> {
        let zk_evm = query_contract(self.client, manager, IForkingManager::zkEVMCall {})
            .await?
            ._0;
        let bridge = query_contract(self.client, manager, IForkingManager::bridgeCall {})
            .await?
            ._0;
        let forkonomic_token =
            query_contract(self.client, manager, IForkingManager::forkonomicTokenCall {})
                .await?
                ._0;
        let global_exit_root =
            query_contract(self.client, manager, IForkingManager::globalExitRootCall {})
                .await?
                ._0;
        let chain_id = query_contract(self.client, zk_evm, IForkableZkEvm::chainIDCall {})
            .await?
            ._0;

        Ok(InstanceRecord {
            zk_evm,
            bridge,
            global_exit_root,
            forking_manager: manager,
            forkonomic_token,
            chain_id,
            genesis_root: parent.genesis_root,
        })
    }
}
