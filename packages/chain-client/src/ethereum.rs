use crate::common::error::ClientError;
use crate::evm::base_client::EvmBaseClient;
use crate::evm::request_provider_client::RequestProviderClient;

use alloy_signer_local::coins_bip39::English;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner};
use async_trait::async_trait;

pub struct EthereumClient {
    pub rpc_url: String,
    pub signer: PrivateKeySigner,
}

impl EthereumClient {
    pub fn new(rpc_url: &str, mnemonic: &str) -> Result<Self, ClientError> {
        let builder = MnemonicBuilder::<English>::default().phrase(mnemonic);

        let signer = builder.index(0)?.build()?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            signer,
        })
    }

    /// Build a client from a raw hex private key, the way deployments load
    /// their deployer account.
    pub fn new_with_key(rpc_url: &str, private_key: &str) -> Result<Self, ClientError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|_| ClientError::ParseError("failed to parse private key".to_string()))?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            signer,
        })
    }
}

#[async_trait]
impl EvmBaseClient for EthereumClient {}

#[async_trait]
impl RequestProviderClient for EthereumClient {
    fn rpc_url(&self) -> String {
        self.rpc_url.clone()
    }

    fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        network::TransactionBuilder,
        primitives::{Address, U256},
        rpc::types::TransactionRequest,
    };

    use super::*;

    const TEST_RPC_URL: &str = "http://127.0.0.1:8545";
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_mnemonic_and_key_agree() {
        let from_mnemonic = EthereumClient::new(TEST_RPC_URL, TEST_MNEMONIC).unwrap();
        // first account of the standard test mnemonic
        let from_key = EthereumClient::new_with_key(
            TEST_RPC_URL,
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();

        assert_eq!(from_mnemonic.signer.address(), from_key.signer.address());
    }

    #[tokio::test]
    #[ignore = "requires local anvil instance"]
    async fn test_eth_latest_block_height() {
        let client = EthereumClient::new(TEST_RPC_URL, TEST_MNEMONIC).unwrap();

        let block_number = client.latest_block_height().await.unwrap();
        assert_ne!(block_number, 0);
    }

    #[tokio::test]
    #[ignore = "requires local anvil instance"]
    async fn test_eth_query_balance() {
        let client = EthereumClient::new(TEST_RPC_URL, TEST_MNEMONIC).unwrap();
        let accounts = client.get_provider_accounts().await.unwrap();

        let balance = client
            .query_balance(&accounts[0].to_string())
            .await
            .unwrap();

        assert_ne!(balance, U256::from(0));
    }

    #[tokio::test]
    #[ignore = "requires local anvil instance"]
    async fn test_eth_transfer() {
        let client = EthereumClient::new(TEST_RPC_URL, TEST_MNEMONIC).unwrap();
        let accounts = client.get_provider_accounts().await.unwrap();

        let pre_balance = client
            .query_balance(&accounts[1].to_string())
            .await
            .unwrap();

        let transfer_request = TransactionRequest::default()
            .with_to(accounts[1])
            .with_value(U256::from(200));

        client.execute_tx(transfer_request).await.unwrap();

        let post_balance = client
            .query_balance(&accounts[1].to_string())
            .await
            .unwrap();

        assert_eq!(pre_balance + U256::from(200), post_balance);
    }

    #[tokio::test]
    #[ignore = "requires local anvil instance"]
    async fn test_eth_get_code_empty_for_eoa() {
        let client = EthereumClient::new(TEST_RPC_URL, TEST_MNEMONIC).unwrap();

        let code = client.get_code(Address::ZERO).await.unwrap();
        assert!(code.is_empty());
    }
}
