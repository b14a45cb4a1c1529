//! # Retrying Funder
//!
//! Tops up accounts from a funding contract. Each attempt is a fresh
//! `withdrawTo(target, value)` envelope followed by a bounded receipt-chain
//! wait; `algorithms::retry` decides what happens next.

use crate::algorithms::{
    classify_completion, decide, wait_until_completed, AttemptOutcome, RetryDecision,
};
use crate::application::wallet::AccountClient;
use crate::config::{RetryConfig, WaitConfig};
use crate::domain::{AbiValue, Address, ExecutionFailurePolicy, Hash, WalletError};
use crate::ports::{FunderApi, NodeRpc, Signer, FAUCET_WITHDRAW_TO};
use async_trait::async_trait;
use primitive_types::U256;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Bounded-retry funding client.
pub struct RetryingFunder<R: NodeRpc, S: Signer> {
    account: AccountClient<R, S>,
    retry: RetryConfig,
}

impl<R: NodeRpc, S: Signer> RetryingFunder<R, S> {
    /// Fund from `account`, using its configured retry budget.
    pub fn new(account: AccountClient<R, S>) -> Self {
        let retry = account.config().retry;
        Self { account, retry }
    }

    /// Override the retry configuration.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Override only the execution-failure policy.
    pub fn with_execution_failure_policy(mut self, policy: ExecutionFailurePolicy) -> Self {
        self.retry.execution_failure = policy;
        self
    }

    /// Funding account.
    pub fn account(&self) -> &AccountClient<R, S> {
        &self.account
    }

    /// Top up `target` within the configured `max_attempts` budget.
    pub async fn withdraw(&self, target: Address, value: U256) -> Result<Hash, WalletError> {
        self.withdraw_with_retry(target, value, self.retry.max_attempts)
            .await
    }

    fn attempt_wait(&self) -> WaitConfig {
        self.account
            .config()
            .receipts
            .with_timeout(self.retry.attempt_timeout())
    }

    async fn attempt(&self, target: Address, value: U256) -> (Option<Hash>, AttemptOutcome) {
        let args = [AbiValue::Address(target), AbiValue::Uint(value)];
        let hash = match self.account.call(FAUCET_WITHDRAW_TO, &args, None, None).await {
            Ok(hash) => hash,
            Err(e) => return (None, AttemptOutcome::Errored(e)),
        };
        let wait = self.attempt_wait();
        let outcome = match wait_until_completed(
            self.account.rpc().as_ref(),
            self.account.shard_id(),
            hash,
            &wait,
        )
        .await
        {
            Ok(completion) => classify_completion(&completion),
            Err(e) => AttemptOutcome::Errored(e),
        };
        (Some(hash), outcome)
    }
}

#[async_trait]
impl<R: NodeRpc, S: Signer> FunderApi for RetryingFunder<R, S> {
    async fn withdraw_with_retry(
        &self,
        target: Address,
        value: U256,
        max_attempts: u32,
    ) -> Result<Hash, WalletError> {
        if max_attempts == 0 {
            return Err(WalletError::Configuration(
                "max_attempts must be at least 1".into(),
            ));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (hash, outcome) = self.attempt(target, value).await;
            let decision = decide(
                outcome,
                hash,
                attempt,
                max_attempts,
                self.retry.execution_failure,
            );

            match decision {
                RetryDecision::Done => {
                    let hash = hash.ok_or_else(|| {
                        WalletError::Submission("confirmed attempt has no hash".into())
                    })?;
                    info!(
                        hash = %hex::encode(hash),
                        target = %target,
                        attempt,
                        "Funding confirmed"
                    );
                    return Ok(hash);
                }
                RetryDecision::Retry => {
                    warn!(
                        target = %target,
                        attempt,
                        max_attempts,
                        "Funding not confirmed, retrying"
                    );
                }
                RetryDecision::RetryAfterBackoff => {
                    warn!(
                        target = %target,
                        attempt,
                        max_attempts,
                        backoff_ms = self.retry.backoff_ms,
                        "Funding attempt errored, backing off"
                    );
                    sleep(self.retry.backoff()).await;
                }
                RetryDecision::Fail(err) => {
                    error!(target = %target, attempt, error = %err, "Funding failed");
                    return Err(err);
                }
            }
        }
    }
}
