//! One retry policy for every chain submission call site. Errors classified
//! transient (see `OrchestratorError::is_transient`) are resubmitted a fixed
//! number of times with a fixed backoff; everything else propagates on the
//! first failure.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use log::warn;
use tokio::time::sleep;

use crate::domain::{execute_contract_call, ChainClient, TxOutcome};
use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            backoff,
        }
    }

    /// Default for transaction submission.
    pub const fn chain_default() -> Self {
        RetryPolicy::new(5, Duration::from_secs(5))
    }

    /// No retries, for call sites that must observe the first failure.
    pub const fn none() -> Self {
        RetryPolicy::new(1, Duration::ZERO)
    }

    /// Submit a typed contract call under this policy.
    pub async fn submit<C: SolCall>(
        &self,
        label: &str,
        client: &dyn ChainClient,
        to: Address,
        call: &C,
        gas_limit: Option<u64>,
    ) -> OrchestratorResult<TxOutcome> {
        let mut attempt = 1;
        loop {
            match execute_contract_call(client, to, call, gas_limit).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    let e = OrchestratorError::from(e);
                    if e.is_transient() && attempt < self.max_attempts {
                        warn!(
                            "'{label}' attempt {attempt}/{} failed: {e}, retrying in {}s",
                            self.max_attempts,
                            self.backoff.as_secs()
                        );
                        sleep(self.backoff).await;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> OrchestratorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OrchestratorResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "'{label}' attempt {attempt}/{} failed: {e}, retrying in {}s",
                        self.max_attempts,
                        self.backoff.as_secs()
                    );
                    sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
