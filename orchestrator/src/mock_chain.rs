//! Scripted in-process chain used by the test suite. It keeps a code store,
//! understands the stack deployer's create2 entry points, fabricates plain
//! CREATE addresses, and answers `eth_call`s from queued responses.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, TxKind};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use anyhow::anyhow;
use async_trait::async_trait;
use backstop_chain_client::common::error::ClientError;

use crate::contracts::IStackDeployer;
use crate::create2::{create2_address, init_code_hash};
use crate::domain::{ChainClient, ChainClientResult, TxOutcome};

#[derive(Default)]
struct MockChainState {
    code: HashMap<Address, Bytes>,
    call_responses: HashMap<(Address, [u8; 4]), VecDeque<Bytes>>,
    code_on_send: HashMap<[u8; 4], Vec<(Address, Bytes)>>,
    sent: Vec<TransactionRequest>,
    create_nonce: u64,
    timestamp: u64,
    auto_advance: u64,
    send_failures: u32,
}

pub struct MockChain {
    sender: Address,
    state: Mutex<MockChainState>,
}

impl fmt::Debug for MockChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockChain")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        MockChain {
            sender: Address::repeat_byte(0x11),
            state: Mutex::new(MockChainState::default()),
        }
    }

    pub fn set_code(&self, addr: Address, code: impl Into<Bytes>) {
        self.state.lock().unwrap().code.insert(addr, code.into());
    }

    /// Queue a raw response for a (contract, selector) pair. Responses are
    /// consumed in order; the last one sticks.
    pub fn set_call_response(&self, to: Address, selector: [u8; 4], response: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .call_responses
            .entry((to, selector))
            .or_default()
            .push_back(response.into());
    }

    /// Convenience for single-value returns.
    pub fn respond_with<T: SolValue>(&self, to: Address, selector: [u8; 4], value: T) {
        self.set_call_response(to, selector, value.abi_encode());
    }

    /// Code writes applied when a transaction with this selector is sent,
    /// e.g. the proxies a spawn call creates.
    pub fn set_code_on_send(&self, selector: [u8; 4], effects: Vec<(Address, Bytes)>) {
        self.state
            .lock()
            .unwrap()
            .code_on_send
            .insert(selector, effects);
    }

    pub fn set_timestamp(&self, timestamp: u64) {
        self.state.lock().unwrap().timestamp = timestamp;
    }

    /// Advance the clock by this much on every timestamp read.
    pub fn set_auto_advance(&self, step: u64) {
        self.state.lock().unwrap().auto_advance = step;
    }

    /// Make the next `n` sends fail with a transient transport error.
    pub fn fail_next_sends(&self, n: u32) {
        self.state.lock().unwrap().send_failures = n;
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Sent transactions whose calldata starts with `selector`.
    pub fn sent_with_selector(&self, selector: [u8; 4]) -> usize {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|tx| {
                tx.input
                    .input()
                    .map(|input| input.starts_with(&selector))
                    .unwrap_or(false)
            })
            .count()
    }
}

fn selector_of(input: &[u8]) -> Option<[u8; 4]> {
    input.get(0..4).map(|s| {
        let mut sel = [0u8; 4];
        sel.copy_from_slice(s);
        sel
    })
}

#[async_trait]
impl ChainClient for MockChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn get_code(&self, address: Address) -> ChainClientResult<Bytes> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> ChainClientResult<TxOutcome> {
        let mut state = self.state.lock().unwrap();

        if state.send_failures > 0 {
            state.send_failures -= 1;
            return Err(ClientError::TransactionError(
                "replacement transaction underpriced".to_string(),
            )
            .into());
        }

        state.sent.push(tx.clone());
        let block_number = state.sent.len() as u64;
        let tx_hash = keccak256(block_number.to_be_bytes());

        let input = tx.input.input().cloned().unwrap_or_default();
        let mut contract_address = None;

        match tx.to {
            None | Some(TxKind::Create) => {
                state.create_nonce += 1;
                let addr = Address::from_slice(
                    &keccak256((self.sender, state.create_nonce).abi_encode())[12..],
                );
                state.code.insert(addr, input.clone());
                contract_address = Some(addr);
            }
            Some(TxKind::Call(to)) => {
                if let Some(selector) = selector_of(&input) {
                    if selector == IStackDeployer::deployDeterministicCall::SELECTOR {
                        let call =
                            IStackDeployer::deployDeterministicCall::abi_decode(&input, true)
                                .map_err(|e| anyhow!("bad deployDeterministic calldata: {e}"))?;
                        let predicted = create2_address(
                            to,
                            call.salt,
                            init_code_hash(&call.initBytecode),
                        );
                        state.code.insert(predicted, call.initBytecode);
                    } else if selector == IStackDeployer::deployDeterministicAndCallCall::SELECTOR {
                        let call = IStackDeployer::deployDeterministicAndCallCall::abi_decode(
                            &input, true,
                        )
                        .map_err(|e| anyhow!("bad deployDeterministicAndCall calldata: {e}"))?;
                        let predicted = create2_address(
                            to,
                            call.salt,
                            init_code_hash(&call.initBytecode),
                        );
                        state.code.insert(predicted, call.initBytecode);
                    }

                    if let Some(effects) = state.code_on_send.get(&selector).cloned() {
                        for (addr, code) in effects {
                            state.code.insert(addr, code);
                        }
                    }
                }
            }
        }

        Ok(TxOutcome {
            tx_hash,
            block_number,
            contract_address,
            success: true,
        })
    }

    async fn call(&self, tx: TransactionRequest) -> ChainClientResult<Bytes> {
        let to = match tx.to {
            Some(TxKind::Call(to)) => to,
            _ => return Err(anyhow!("mock call without target").into()),
        };
        let input = tx.input.input().cloned().unwrap_or_default();
        let selector =
            selector_of(&input).ok_or_else(|| anyhow!("mock call without selector"))?;

        let mut state = self.state.lock().unwrap();
        let queue = state
            .call_responses
            .get_mut(&(to, selector))
            .ok_or_else(|| {
                anyhow!("no scripted response for {to} selector 0x{}", hex::encode(selector))
            })?;

        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        Ok(response)
    }

    async fn latest_timestamp(&self) -> ChainClientResult<u64> {
        let mut state = self.state.lock().unwrap();
        let now = state.timestamp;
        state.timestamp += state.auto_advance;
        Ok(now)
    }
}
