//! In-Memory Node Adapter
//!
//! Implements the `NodeRpc` port against a process-local ledger. Wallet and
//! funding contract calls are executed natively: balances move, seqnos
//! advance and receipts appear on the destination shard. Faults can be
//! injected per call family for retry tests.

use super::rlp_abi_codec::{selector, RlpAbiCodec};
use crate::domain::{
    keccak256, AbiValue, Address, BlockTag, DeployPayload, Hash, MessageEnvelope, Receipt,
    ShardId, WalletError,
};
use crate::ports::outbound::{NodeRpc, FAUCET_WITHDRAW_TO, WALLET_ASYNC_CALL, WALLET_SYNC_CALL};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug, Default)]
struct Account {
    seqno: u64,
    balance: U256,
    deployed: bool,
    code: Vec<u8>,
}

#[derive(Default)]
struct NodeState {
    accounts: HashMap<Address, Account>,
    receipts: HashMap<(ShardId, Hash), Receipt>,
    submissions: Vec<Vec<u8>>,
    fail_submissions: usize,
    fail_receipt_queries: usize,
    fail_executions: usize,
    withhold_receipts: usize,
    latency: Option<Duration>,
}

/// Process-local node.
pub struct InMemoryNode {
    chain_id: u64,
    codec: RlpAbiCodec,
    state: Mutex<NodeState>,
}

impl InMemoryNode {
    /// Create an empty node for `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            codec: RlpAbiCodec::new(),
            state: Mutex::new(NodeState::default()),
        }
    }

    /// Create a deployed account holding `balance`.
    pub fn create_account(&self, address: Address, balance: U256) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(address).or_default();
        account.deployed = true;
        account.balance = balance;
    }

    /// Credit `value` to `address`, deployed or not.
    pub fn credit(&self, address: Address, value: U256) {
        let mut state = self.state.lock();
        let account = state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(value);
    }

    /// Balance of `address`.
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.state
            .lock()
            .accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Whether code lives at `address`.
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.state
            .lock()
            .accounts
            .get(address)
            .map(|a| a.deployed)
            .unwrap_or(false)
    }

    /// Init code stored by the deploy of `address`.
    pub fn code_of(&self, address: &Address) -> Option<Vec<u8>> {
        self.state
            .lock()
            .accounts
            .get(address)
            .filter(|a| a.deployed)
            .map(|a| a.code.clone())
    }

    /// Store a receipt as if `receipt.shard_id` had processed it.
    pub fn insert_receipt(&self, receipt: Receipt) {
        self.state
            .lock()
            .receipts
            .insert((receipt.shard_id, receipt.message_hash), receipt);
    }

    /// Every raw submission, including rejected ones.
    pub fn submissions(&self) -> Vec<Vec<u8>> {
        self.state.lock().submissions.clone()
    }

    /// Number of submissions received.
    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Fail the next `n` submissions with a transport error.
    pub fn fail_next_submissions(&self, n: usize) {
        self.state.lock().fail_submissions = n;
    }

    /// Fail the next `n` receipt queries with a transport error.
    pub fn fail_next_receipt_queries(&self, n: usize) {
        self.state.lock().fail_receipt_queries = n;
    }

    /// Accept the next `n` messages but report `success = false`.
    pub fn fail_next_executions(&self, n: usize) {
        self.state.lock().fail_executions = n;
    }

    /// Accept and execute the next `n` messages without publishing receipts.
    pub fn withhold_next_receipts(&self, n: usize) {
        self.state.lock().withhold_receipts = n;
    }

    /// Delay every RPC by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn execute(
        &self,
        state: &mut NodeState,
        envelope: &MessageEnvelope,
        hash: Hash,
    ) -> Result<Vec<Receipt>, WalletError> {
        let origin = envelope.to();
        let shard = origin.shard_id();

        if envelope.is_deploy() {
            let payload = DeployPayload::decode(envelope.data())
                .map_err(|e| WalletError::Submission(e.to_string()))?;
            let account = state.accounts.entry(origin).or_default();
            account.deployed = true;
            account.code = payload.init_code();
            return Ok(vec![Receipt::success(hash, shard)]);
        }

        if envelope.data().is_empty() {
            return Ok(vec![Receipt::success(hash, shard)]);
        }

        let (sel, args) = match self.codec.decode_call(envelope.data()) {
            Ok(call) => call,
            Err(e) => return Ok(vec![Receipt::failure(hash, shard, e.to_string())]),
        };

        if sel == selector(WALLET_ASYNC_CALL) || sel == selector(WALLET_SYNC_CALL) {
            if let [AbiValue::Address(dst), AbiValue::Uint(value), AbiValue::Uint(gas), AbiValue::Bytes(_)] =
                args.as_slice()
            {
                if sel == selector(WALLET_SYNC_CALL) && dst.shard_id() != shard {
                    return Ok(vec![Receipt::failure(hash, shard, "syncCall crosses shards")]);
                }
                let gas = gas.low_u64();
                return Ok(transfer(state, hash, origin, *dst, *value, gas));
            }
        } else if sel == selector(FAUCET_WITHDRAW_TO) {
            if let [AbiValue::Address(dst), AbiValue::Uint(value)] = args.as_slice() {
                return Ok(transfer(state, hash, origin, *dst, *value, 0));
            }
        } else {
            return Ok(vec![Receipt::failure(hash, shard, "unknown function")]);
        }
        Ok(vec![Receipt::failure(hash, shard, "malformed arguments")])
    }
}

/// Move `value` from `from` to `to`. Cross-shard moves emit an outgoing
/// message whose receipt lands on the destination shard.
fn transfer(
    state: &mut NodeState,
    hash: Hash,
    from: Address,
    to: Address,
    value: U256,
    gas: u64,
) -> Vec<Receipt> {
    let shard = from.shard_id();
    let sender = state.accounts.entry(from).or_default();
    if sender.balance < value {
        return vec![Receipt::failure(hash, shard, "insufficient balance")];
    }
    sender.balance -= value;

    let recipient = state.accounts.entry(to).or_default();
    recipient.balance = recipient.balance.saturating_add(value);

    let mut origin = Receipt::success(hash, shard);
    origin.gas_used = gas;
    if to.shard_id() == shard {
        return vec![origin];
    }

    let mut material = hash.to_vec();
    material.extend_from_slice(to.as_bytes());
    let forwarded = keccak256(&material);
    vec![
        origin.with_outgoing(forwarded, to),
        Receipt::success(forwarded, to.shard_id()),
    ]
}

#[async_trait]
impl NodeRpc for InMemoryNode {
    async fn submit_raw_message(&self, raw: &[u8]) -> Result<Hash, WalletError> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.submissions.push(raw.to_vec());

        if state.fail_submissions > 0 {
            state.fail_submissions -= 1;
            return Err(WalletError::Transport("injected submission failure".into()));
        }

        let envelope =
            MessageEnvelope::decode(raw).map_err(|e| WalletError::Submission(e.to_string()))?;
        if envelope.chain_id() != self.chain_id {
            return Err(WalletError::Submission(format!(
                "wrong chain id {}, node runs {}",
                envelope.chain_id(),
                self.chain_id
            )));
        }
        if envelope.requires_signature() && !envelope.is_signed() {
            return Err(WalletError::Submission("missing signature".into()));
        }

        let hash = envelope.hash();
        let account = state.accounts.entry(envelope.to()).or_default();
        if envelope.seqno() != account.seqno {
            return Err(WalletError::Submission(format!(
                "seqno mismatch: expected {}, got {}",
                account.seqno,
                envelope.seqno()
            )));
        }
        if envelope.is_deploy() && account.deployed {
            return Err(WalletError::Submission("account already deployed".into()));
        }
        if !envelope.is_deploy() && !account.deployed {
            return Err(WalletError::Submission("account not deployed".into()));
        }

        let receipts = if state.fail_executions > 0 {
            state.fail_executions -= 1;
            vec![Receipt::failure(hash, envelope.to().shard_id(), "injected execution failure")]
        } else {
            self.execute(&mut state, &envelope, hash)?
        };
        state.accounts.entry(envelope.to()).or_default().seqno += 1;

        debug!(
            hash = %hex::encode(hash),
            to = %envelope.to(),
            seqno = envelope.seqno(),
            receipts = receipts.len(),
            "Message accepted"
        );

        if state.withhold_receipts > 0 {
            state.withhold_receipts -= 1;
        } else {
            for receipt in receipts {
                state
                    .receipts
                    .insert((receipt.shard_id, receipt.message_hash), receipt);
            }
        }
        Ok(hash)
    }

    async fn get_seqno(&self, address: &Address, _tag: BlockTag) -> Result<u64, WalletError> {
        self.simulate_latency().await;
        Ok(self
            .state
            .lock()
            .accounts
            .get(address)
            .map(|a| a.seqno)
            .unwrap_or(0))
    }

    async fn get_chain_id(&self) -> Result<u64, WalletError> {
        self.simulate_latency().await;
        Ok(self.chain_id)
    }

    async fn get_receipt(
        &self,
        shard_id: ShardId,
        hash: &Hash,
    ) -> Result<Option<Receipt>, WalletError> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        if state.fail_receipt_queries > 0 {
            state.fail_receipt_queries -= 1;
            return Err(WalletError::Transport("injected receipt query failure".into()));
        }
        Ok(state.receipts.get(&(shard_id, *hash)).cloned())
    }
}
