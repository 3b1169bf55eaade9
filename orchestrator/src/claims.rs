//! Completing cross-chain transfers: poll the bridge indexing API for
//! deposits directed at an address, fetch a merkle inclusion proof for each
//! claimable one and replay it against the destination bridge contract.
//! Claims are independent: one bad proof is captured and reported without
//! blocking the rest.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::sleep;

use crate::contracts::IForkableBridge;
use crate::domain::ChainClient;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::retry::RetryPolicy;

pub type ClaimResult<T> = Result<T, ClaimError>;

const MERKLE_PROOF_PATH: &str = "/merkle-proof";
const GET_CLAIMS_FROM_ACC_PATH: &str = "/bridges/";

const DEPOSIT_PAGE_LIMIT: u32 = 100;
/// Fixed backoff between polls of the indexing API.
pub const CLAIM_POLL_BACKOFF: Duration = Duration::from_secs(5);
/// Claim transactions get a fixed gas ceiling; estimation against a proof
/// that is not yet final is useless.
pub const CLAIM_GAS_LIMIT: u64 = 100_000;

const LEAF_TYPE_MESSAGE: u8 = 1;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("bridge api request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("unexpected bridge api payload: {0}")]
    Payload(String),
}

/// One deposit as reported by the indexing API. Numeric fields arrive as
/// strings and are parsed at the claim call site.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRecord {
    #[serde(default)]
    pub leaf_type: u8,
    pub orig_net: u32,
    pub orig_addr: Address,
    pub dest_net: u32,
    pub dest_addr: Address,
    pub amount: String,
    #[serde(default)]
    pub metadata: String,
    pub deposit_cnt: String,
    pub tx_hash: String,
    #[serde(default)]
    pub claim_tx_hash: String,
    pub ready_for_claim: bool,
}

#[derive(Debug, Deserialize)]
struct DepositsResponse {
    #[serde(default)]
    deposits: Vec<DepositRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerkleProof {
    pub merkle_proof: Vec<B256>,
    pub main_exit_root: B256,
    pub rollup_exit_root: B256,
}

#[derive(Debug, Deserialize)]
struct ProofResponse {
    proof: MerkleProof,
}

/// Read-only consumer of the bridge indexing service.
#[async_trait]
pub trait DepositApi: Send + Sync {
    async fn get_deposits(
        &self,
        dest_addr: Address,
        limit: u32,
        offset: u32,
    ) -> ClaimResult<Vec<DepositRecord>>;

    async fn get_merkle_proof(&self, deposit_cnt: &str, net_id: u32) -> ClaimResult<MerkleProof>;
}

#[derive(Debug, Clone)]
pub struct BridgeApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl BridgeApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        BridgeApiClient {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DepositApi for BridgeApiClient {
    async fn get_deposits(
        &self,
        dest_addr: Address,
        limit: u32,
        offset: u32,
    ) -> ClaimResult<Vec<DepositRecord>> {
        let url = format!("{}{}{}", self.base_url, GET_CLAIMS_FROM_ACC_PATH, dest_addr);
        let body = self
            .http
            .get(url)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let response: DepositsResponse =
            serde_json::from_str(&body).map_err(|e| ClaimError::Payload(e.to_string()))?;
        Ok(response.deposits)
    }

    async fn get_merkle_proof(&self, deposit_cnt: &str, net_id: u32) -> ClaimResult<MerkleProof> {
        let url = format!("{}{}", self.base_url, MERKLE_PROOF_PATH);
        let body = self
            .http
            .get(url)
            .query(&[
                ("deposit_cnt", deposit_cnt.to_string()),
                ("net_id", net_id.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let response: ProofResponse =
            serde_json::from_str(&body).map_err(|e| ClaimError::Payload(e.to_string()))?;
        Ok(response.proof)
    }
}

/// Drop deposits that are not finalized yet or were already claimed.
pub fn filter_claimable(deposits: &[DepositRecord], verbose: bool) -> Vec<DepositRecord> {
    let mut claimable = vec![];
    for deposit in deposits {
        if !deposit.ready_for_claim {
            if verbose {
                info!("Not ready yet: {}", deposit.tx_hash);
            }
        } else if !deposit.claim_tx_hash.is_empty() {
            if verbose {
                info!("already claimed: {}", deposit.claim_tx_hash);
            }
        } else {
            claimable.push(deposit.clone());
        }
    }
    claimable
}

/// Outcome of one resolver pass: which deposits were claimed and which
/// failed, in submission order.
#[derive(Debug, Default)]
pub struct ClaimReport {
    pub claimed: Vec<(String, B256)>,
    pub failed: Vec<(String, OrchestratorError)>,
}

impl ClaimReport {
    pub fn log_summary(&self) {
        info!(
            "Claim run finished: {} claimed, {} failed",
            self.claimed.len(),
            self.failed.len()
        );
        for (deposit, error) in &self.failed {
            warn!("claim for deposit {deposit} failed: {error}");
        }
    }
}

pub struct ClaimResolver<'a> {
    client: &'a dyn ChainClient,
    api: &'a dyn DepositApi,
    /// The destination chain's bridge contract.
    pub bridge: Address,
    retry: RetryPolicy,
    poll_backoff: Duration,
}

impl<'a> ClaimResolver<'a> {
    pub fn new(client: &'a dyn ChainClient, api: &'a dyn DepositApi, bridge: Address) -> Self {
        ClaimResolver {
            client,
            api,
            bridge,
            retry: RetryPolicy::chain_default(),
            poll_backoff: CLAIM_POLL_BACKOFF,
        }
    }

    pub fn with_poll_backoff(mut self, poll_backoff: Duration) -> Self {
        self.poll_backoff = poll_backoff;
        self
    }

    /// Poll until at least one deposit for `claim_for` is claimable. An empty
    /// result set is not a failure, only a reason to wait.
    pub async fn wait_for_claimable(
        &self,
        claim_for: Address,
    ) -> OrchestratorResult<Vec<DepositRecord>> {
        info!(
            "Trying claim for {} against bridge {} ...",
            claim_for, self.bridge
        );
        loop {
            match self
                .api
                .get_deposits(claim_for, DEPOSIT_PAGE_LIMIT, 0)
                .await
            {
                Ok(deposits) => {
                    let claimable = filter_claimable(&deposits, true);
                    if !claimable.is_empty() {
                        return Ok(claimable);
                    }
                    info!(
                        "No deposits ready to claim yet, retrying in {} seconds...",
                        self.poll_backoff.as_secs()
                    );
                }
                Err(e) => {
                    warn!(
                        "bridge api poll failed: {e}, retrying in {} seconds...",
                        self.poll_backoff.as_secs()
                    );
                }
            }
            sleep(self.poll_backoff).await;
        }
    }

    /// Submit every claim, capturing failures individually so one bad proof
    /// does not block the deposits after it.
    pub async fn claim_all(&self, deposits: &[DepositRecord]) -> ClaimReport {
        let mut report = ClaimReport::default();
        for deposit in deposits {
            match self.claim_one(deposit).await {
                Ok(tx_hash) => {
                    info!("Claim successfully mined: {tx_hash}");
                    report.claimed.push((deposit.tx_hash.clone(), tx_hash));
                }
                Err(e) => {
                    report.failed.push((deposit.tx_hash.clone(), e));
                }
            }
        }
        report
    }

    async fn claim_one(&self, deposit: &DepositRecord) -> OrchestratorResult<B256> {
        let proof = self
            .api
            .get_merkle_proof(&deposit.deposit_cnt, deposit.orig_net)
            .await?;

        let smt_proof: [B256; 32] = proof.merkle_proof.clone().try_into().map_err(|_| {
            ClaimError::Payload(format!(
                "expected 32 merkle siblings, got {}",
                proof.merkle_proof.len()
            ))
        })?;
        let index: u32 = deposit.deposit_cnt.parse().map_err(|_| {
            ClaimError::Payload(format!("deposit_cnt is not a number: {}", deposit.deposit_cnt))
        })?;
        let amount = U256::from_str(&deposit.amount).map_err(|_| {
            ClaimError::Payload(format!("amount is not a number: {}", deposit.amount))
        })?;
        let metadata = parse_metadata(&deposit.metadata)?;

        let call_data = if deposit.leaf_type == LEAF_TYPE_MESSAGE {
            IForkableBridge::claimMessageCall {
                smtProof: smt_proof,
                index,
                mainnetExitRoot: proof.main_exit_root,
                rollupExitRoot: proof.rollup_exit_root,
                originNetwork: deposit.orig_net,
                originAddress: deposit.orig_addr,
                destinationNetwork: deposit.dest_net,
                destinationAddress: deposit.dest_addr,
                amount,
                metadata,
            }
            .abi_encode()
        } else {
            IForkableBridge::claimAssetCall {
                smtProof: smt_proof,
                index,
                mainnetExitRoot: proof.main_exit_root,
                rollupExitRoot: proof.rollup_exit_root,
                originNetwork: deposit.orig_net,
                originTokenAddress: deposit.orig_addr,
                destinationNetwork: deposit.dest_net,
                destinationAddress: deposit.dest_addr,
                amount,
                metadata,
            }
            .abi_encode()
        };

        let outcome = self
            .retry
            .run("claim_deposit", || {
                let call_data = call_data.clone();
                async move {
                    use alloy::network::TransactionBuilder;
                    let tx = alloy::rpc::types::TransactionRequest::default()
                        .with_to(self.bridge)
                        .with_input(call_data)
                        .with_gas_limit(CLAIM_GAS_LIMIT);

                    let outcome = self.client.send_transaction(tx).await?;
                    if !outcome.success {
                        return Err(OrchestratorError::TransactionReverted(
                            outcome.tx_hash.to_string(),
                        ));
                    }
                    Ok(outcome)
                }
            })
            .await?;
        Ok(outcome.tx_hash)
    }
}

fn parse_metadata(metadata: &str) -> ClaimResult<Bytes> {
    let trimmed = metadata.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(Bytes::new());
    }
    hex::decode(trimmed)
        .map(Bytes::from)
        .map_err(|_| ClaimError::Payload(format!("metadata is not hex: {metadata}")))
}
