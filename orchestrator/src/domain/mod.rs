pub mod eth_evm;

use std::fmt;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use eth_evm::EthEvmClient;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use backstop_chain_client::common::error::ClientError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

pub type ChainClientResult<T> = Result<T, ChainClientError>;

#[derive(Error, Debug)]
pub enum ChainClientError {
    #[error(transparent)]
    Error(#[from] anyhow::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    AbiError(#[from] alloy::sol_types::Error),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),
}

impl ChainClientError {
    /// Transport and transaction submission failures are worth retrying;
    /// everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainClientError::Client(
                ClientError::QueryError(_) | ClientError::TransactionError(_)
            )
        )
    }
}

/// We need some way of knowing which domain we are talking with.
#[derive(Debug, Clone, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    EthEvm(String),
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IMPORTANT: to get from_string, we need to separate everything using ":"
        match self {
            Domain::EthEvm(chain_name) => write!(f, "EthEvm:{}", chain_name),
        }
    }
}

impl Domain {
    pub fn from_string(input: String) -> Result<Domain, anyhow::Error> {
        let mut split = input.split(':');

        let domain = split.next().context("Domain is missing")?;

        match domain {
            "EthEvm" => Ok(Domain::EthEvm(
                split
                    .next()
                    .context("EthEvm Domain missing chain name")?
                    .to_string(),
            )),
            s => Err(anyhow!(format!("Failed to parse domain from string: {}", s))),
        }
    }

    pub fn get_chain_name(&self) -> &str {
        match self {
            Domain::EthEvm(chain_name) => chain_name,
        }
    }

    pub async fn generate_client(&self) -> ChainClientResult<Box<dyn ChainClient>> {
        Ok(match self {
            Domain::EthEvm(chain_name) => Box::new(EthEvmClient::new(chain_name.as_str()).await?),
        })
    }
}

/// Digested result of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: u64,
    pub contract_address: Option<Address>,
    pub success: bool,
}

/// The only chain surface the orchestrator depends on: reading code at an
/// address, submitting transactions and waiting for confirmation, and
/// reading public contract state.
#[async_trait]
pub trait ChainClient: fmt::Debug + Send + Sync {
    /// The account every transaction of this run is sent from.
    fn sender(&self) -> Address;

    async fn get_code(&self, address: Address) -> ChainClientResult<Bytes>;

    /// Submit a transaction and suspend until it is confirmed or failed.
    async fn send_transaction(&self, tx: TransactionRequest) -> ChainClientResult<TxOutcome>;

    async fn call(&self, tx: TransactionRequest) -> ChainClientResult<Bytes>;

    async fn latest_timestamp(&self) -> ChainClientResult<u64>;
}

/// Read public contract state through a typed call.
pub async fn query_contract<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: C,
) -> ChainClientResult<C::Return> {
    let tx = TransactionRequest::default()
        .with_to(to)
        .with_input(call.abi_encode());

    let raw = client.call(tx).await?;

    Ok(C::abi_decode_returns(&raw, true)?)
}

/// Submit a typed state-changing call and verify it did not revert.
pub async fn execute_contract_call<C: SolCall>(
    client: &dyn ChainClient,
    to: Address,
    call: &C,
    gas_limit: Option<u64>,
) -> ChainClientResult<TxOutcome> {
    let mut tx = TransactionRequest::default()
        .with_to(to)
        .with_input(call.abi_encode());
    if let Some(gas) = gas_limit {
        tx = tx.with_gas_limit(gas);
    }

    let outcome = client.send_transaction(tx).await?;
    if !outcome.success {
        return Err(anyhow!("transaction {} reverted on chain", outcome.tx_hash).into());
    }

    Ok(outcome)
}
