use std::{env, fmt};

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use backstop_chain_client::ethereum::EthereumClient;
use backstop_chain_client::evm::base_client::EvmBaseClient;

use crate::config::{ChainInfo, GLOBAL_CONFIG};

use super::{ChainClient, ChainClientResult, TxOutcome};

// acc0 of the local dev chain
const DEFAULT_DEPLOYER_PK: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DEPLOYER_PK_ENV: &str = "DEPLOYER_PK";

const GWEI: u128 = 1_000_000_000;

pub struct EthEvmClient {
    inner: EthereumClient,
    chain_name: String,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
}

impl fmt::Debug for EthEvmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthEvmClient")
            .field("chain_name", &self.chain_name)
            .finish_non_exhaustive()
    }
}

impl EthEvmClient {
    pub async fn new(chain_name: &str) -> ChainClientResult<Self> {
        let gc = GLOBAL_CONFIG.lock().await;
        let chain_info: &ChainInfo = gc.get_chain_info(chain_name)?;

        let pk = env::var(DEPLOYER_PK_ENV).unwrap_or(DEFAULT_DEPLOYER_PK.to_string());
        let inner = EthereumClient::new_with_key(&chain_info.rpc, &pk)?;

        if chain_info.max_fee_per_gas_gwei.is_some() {
            log::info!(
                "Hardcoded gas used: MaxPriority {:?} gwei, MaxFee {:?} gwei",
                chain_info.max_priority_fee_per_gas_gwei,
                chain_info.max_fee_per_gas_gwei
            );
        }

        Ok(EthEvmClient {
            inner,
            chain_name: chain_info.name.clone(),
            max_fee_per_gas: chain_info.max_fee_per_gas_gwei.map(|g| g * GWEI),
            max_priority_fee_per_gas: chain_info.max_priority_fee_per_gas_gwei.map(|g| g * GWEI),
        })
    }
}

#[async_trait]
impl ChainClient for EthEvmClient {
    fn sender(&self) -> Address {
        self.inner.signer.address()
    }

    async fn get_code(&self, address: Address) -> ChainClientResult<Bytes> {
        Ok(self.inner.get_code(address).await?)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> ChainClientResult<TxOutcome> {
        let mut tx = tx;
        if let Some(max_fee) = self.max_fee_per_gas {
            tx = tx.with_max_fee_per_gas(max_fee);
        }
        if let Some(max_priority) = self.max_priority_fee_per_gas {
            tx = tx.with_max_priority_fee_per_gas(max_priority);
        }

        let receipt = self.inner.execute_tx(tx).await?;

        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            contract_address: receipt.contract_address,
            success: receipt.status(),
        })
    }

    async fn call(&self, tx: TransactionRequest) -> ChainClientResult<Bytes> {
        Ok(self.inner.call_raw(tx).await?)
    }

    async fn latest_timestamp(&self) -> ChainClientResult<u64> {
        Ok(self.inner.latest_block_timestamp().await?)
    }
}
