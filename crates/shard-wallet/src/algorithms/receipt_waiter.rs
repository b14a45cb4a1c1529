//! # Receipt Chain Polling
//!
//! A submitted message may make the node emit further messages on other
//! shards. The waiter polls the origin receipt, then every outgoing message on
//! its destination shard, breadth-first, until the chain is closed or the
//! deadline passes. Timeouts are not errors: the caller gets whatever was
//! collected, tagged as `Partial` or `TimedOut`.

use crate::config::WaitConfig;
use crate::domain::{Completion, Hash, Receipt, ShardId, WalletError};
use crate::ports::outbound::NodeRpc;
use std::collections::{HashSet, VecDeque};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Poll until the full receipt chain of `hash` is observed or `config` times out.
pub async fn wait_until_completed<R: NodeRpc + ?Sized>(
    rpc: &R,
    origin_shard: ShardId,
    hash: Hash,
    config: &WaitConfig,
) -> Result<Completion, WalletError> {
    let deadline = Instant::now() + config.timeout();
    let mut chain: Vec<Receipt> = Vec::new();
    let mut pending: VecDeque<(ShardId, Hash)> = VecDeque::new();
    let mut seen: HashSet<(ShardId, Hash)> = HashSet::new();

    pending.push_back((origin_shard, hash));
    seen.insert((origin_shard, hash));

    while let Some(&(shard_id, current)) = pending.front() {
        if let Some(receipt) = rpc.get_receipt(shard_id, &current).await? {
            debug!(
                hash = %hex::encode(current),
                shard = shard_id,
                success = receipt.success,
                outgoing = receipt.outgoing.len(),
                "Receipt observed"
            );
            pending.pop_front();
            for out in &receipt.outgoing {
                let hop = (out.to.shard_id(), out.hash);
                if seen.insert(hop) {
                    pending.push_back(hop);
                }
            }
            chain.push(receipt);
            continue;
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(
                hash = %hex::encode(hash),
                collected = chain.len(),
                outstanding = pending.len(),
                "Receipt wait timed out"
            );
            return Ok(if chain.is_empty() {
                Completion::TimedOut
            } else {
                Completion::Partial(chain)
            });
        }
        sleep(config.poll_interval().min(deadline - now)).await;
    }

    Ok(Completion::Complete(chain))
}

/// Poll only the originating shard's receipt.
pub async fn wait_for_origin<R: NodeRpc + ?Sized>(
    rpc: &R,
    shard_id: ShardId,
    hash: Hash,
    config: &WaitConfig,
) -> Result<Option<Receipt>, WalletError> {
    let deadline = Instant::now() + config.timeout();
    loop {
        if let Some(receipt) = rpc.get_receipt(shard_id, &hash).await? {
            return Ok(Some(receipt));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(config.poll_interval().min(deadline - now)).await;
    }
}

/// Receipt waiter bound to a polling configuration.
#[derive(Clone, Copy, Debug)]
pub struct ReceiptWaiter {
    config: WaitConfig,
}

impl ReceiptWaiter {
    /// Create with `config`.
    pub fn new(config: WaitConfig) -> Self {
        Self { config }
    }

    /// Polling configuration.
    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// See [`wait_until_completed`].
    pub async fn wait_until_completed<R: NodeRpc + ?Sized>(
        &self,
        rpc: &R,
        origin_shard: ShardId,
        hash: Hash,
    ) -> Result<Completion, WalletError> {
        wait_until_completed(rpc, origin_shard, hash, &self.config).await
    }

    /// See [`wait_for_origin`].
    pub async fn wait_for_origin<R: NodeRpc + ?Sized>(
        &self,
        rpc: &R,
        shard_id: ShardId,
        hash: Hash,
    ) -> Result<Option<Receipt>, WalletError> {
        wait_for_origin(rpc, shard_id, hash, &self.config).await
    }
}
