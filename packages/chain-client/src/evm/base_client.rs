use std::str::FromStr;

use crate::common::error::ClientError;
use alloy::eips::BlockNumberOrTag;
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{
    fillers::{
        BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    Identity, RootProvider,
};

use alloy::providers::Provider;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;

use super::request_provider_client::RequestProviderClient;

pub type CustomProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// base client trait with default implementations for evm based clients.
///
/// for chains which are somehow unique in their common module implementations,
/// these function definitions can be overridden to match the custom chain logic.
#[async_trait]
pub trait EvmBaseClient: RequestProviderClient + Send + Sync {
    async fn latest_block_height(&self) -> Result<u64, ClientError> {
        let client = self.get_request_provider().await?;

        let block = client.get_block_number().await?;

        Ok(block)
    }

    async fn latest_block_timestamp(&self) -> Result<u64, ClientError> {
        let client = self.get_request_provider().await?;

        let block = client
            .get_block_by_number(BlockNumberOrTag::Latest, false.into())
            .await?
            .ok_or_else(|| ClientError::QueryError("no latest block".to_string()))?;

        Ok(block.header.timestamp)
    }

    async fn query_balance(&self, address: &str) -> Result<U256, ClientError> {
        let client = self.get_request_provider().await?;

        let addr = Address::from_str(address)?;
        let balance = client.get_balance(addr).await?;

        Ok(balance)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ClientError> {
        let client = self.get_request_provider().await?;

        let code = client.get_code_at(address).await?;

        Ok(code)
    }

    async fn execute_tx(
        &self,
        tx: TransactionRequest,
    ) -> Result<TransactionReceipt, ClientError> {
        let client = self.get_request_provider().await?;

        let signed_tx = tx.from(self.signer().address());

        let tx_response = client
            .send_transaction(signed_tx)
            .await?
            .get_receipt()
            .await?;

        Ok(tx_response)
    }

    async fn call_raw(&self, tx: TransactionRequest) -> Result<Bytes, ClientError> {
        let client = self.get_request_provider().await?;

        let raw_response = client.call(&tx).await?;

        Ok(raw_response)
    }
}
