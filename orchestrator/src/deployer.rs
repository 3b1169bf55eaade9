//! Deterministic deployment through the on-chain stack deployer. At most one
//! deployment ever happens per (deployer, salt, init code) triple, no matter
//! how many times the operation is retried across process restarts.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use log::{debug, info};

use crate::contracts::IStackDeployer;
use crate::create2::{create2_address, init_code_hash};
use crate::domain::ChainClient;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::retry::RetryPolicy;

pub struct Create2Deployer<'a> {
    client: &'a dyn ChainClient,
    /// Address of the stack deployer contract all create2 calls go through.
    pub address: Address,
    retry: RetryPolicy,
}

impl<'a> Create2Deployer<'a> {
    pub fn new(client: &'a dyn ChainClient, address: Address, retry: RetryPolicy) -> Self {
        Create2Deployer {
            client,
            address,
            retry,
        }
    }

    /// Predict the target address; if code is already there, attach and
    /// report `false`, otherwise deploy (optionally followed by a call in the
    /// same on-chain step) and report `true`.
    ///
    /// `gas_limit` bypasses estimation, which is unreliable for large
    /// bytecode.
    pub async fn deploy_or_attach(
        &self,
        salt: B256,
        init_code: Vec<u8>,
        post_deploy_call: Option<Vec<u8>>,
        gas_limit: Option<u64>,
    ) -> OrchestratorResult<(Address, bool)> {
        let predicted = create2_address(self.address, salt, init_code_hash(&init_code));

        let code = self.client.get_code(predicted).await?;
        if !code.is_empty() {
            debug!("Contract already deployed on: {predicted}");
            return Ok((predicted, false));
        }

        let call_data = match post_deploy_call {
            Some(data_call) => IStackDeployer::deployDeterministicAndCallCall {
                amount: U256::ZERO,
                salt,
                initBytecode: init_code.into(),
                dataCall: data_call.into(),
            }
            .abi_encode(),
            None => IStackDeployer::deployDeterministicCall {
                amount: U256::ZERO,
                salt,
                initBytecode: init_code.into(),
            }
            .abi_encode(),
        };

        self.retry
            .run("deploy_or_attach", || {
                let call_data = call_data.clone();
                async move {
                    let mut tx = TransactionRequest::default()
                        .with_to(self.address)
                        .with_input(call_data);
                    if let Some(gas) = gas_limit {
                        tx = tx.with_gas_limit(gas);
                    }

                    let outcome = self.client.send_transaction(tx).await?;
                    if !outcome.success {
                        return Err(OrchestratorError::TransactionReverted(
                            outcome.tx_hash.to_string(),
                        ));
                    }
                    Ok(())
                }
            })
            .await?;

        // the transaction confirmed; the predicted address must hold code now
        let code = self.client.get_code(predicted).await?;
        if code.is_empty() {
            return Err(OrchestratorError::DeployedCodeMissing(predicted));
        }

        info!("Contract deployed on: {predicted}");
        Ok((predicted, true))
    }
}
