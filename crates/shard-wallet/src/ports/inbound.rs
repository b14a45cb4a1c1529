//! # Inbound Ports
//!
//! API traits defining what the wallet and the funder can do.

use crate::domain::{Address, AwaitPolicy, Completion, Hash, Salt, ShardId, WalletError};
use async_trait::async_trait;
use primitive_types::U256;

/// Parameters of a call sent through the wallet contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendParams {
    /// Final recipient.
    pub to: Address,
    /// Value forwarded to the recipient.
    pub value: U256,
    /// Gas granted to the forwarded message.
    pub gas: u64,
    /// Optional call payload for the recipient.
    pub data: Vec<u8>,
    /// Explicit seqno; fetched live when absent.
    pub seqno: Option<u64>,
    /// Explicit chain id; fetched live when absent.
    pub chain_id: Option<u64>,
}

impl SendParams {
    /// Plain value transfer.
    pub fn transfer(to: Address, value: U256, gas: u64) -> Self {
        Self {
            to,
            value,
            gas,
            ..Default::default()
        }
    }

    /// Attach a call payload.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

/// Parameters of the wallet's own deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelfDeployParams {
    /// Explicit seqno; fetched live when absent.
    pub seqno: Option<u64>,
    /// Explicit chain id; fetched live when absent.
    pub chain_id: Option<u64>,
    /// How long to wait after submission.
    pub await_policy: AwaitPolicy,
}

impl SelfDeployParams {
    /// Live seqno and chain id, waiting per `await_policy`.
    pub fn awaiting(await_policy: AwaitPolicy) -> Self {
        Self {
            await_policy,
            ..Default::default()
        }
    }
}

/// Parameters of a contract deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployParams {
    /// Target shard.
    pub shard_id: ShardId,
    /// Contract bytecode.
    pub bytecode: Vec<u8>,
    /// ABI-encoded constructor arguments.
    pub args: Vec<u8>,
    /// Derivation salt.
    pub salt: Salt,
    /// Explicit seqno; fetched live when absent.
    pub seqno: Option<u64>,
    /// Explicit chain id; fetched live when absent.
    pub chain_id: Option<u64>,
    /// How long to wait after submission.
    pub await_policy: AwaitPolicy,
}

impl DeployParams {
    /// Deploy `bytecode` with `args` on `shard_id`, default salt, detached.
    pub fn new(shard_id: ShardId, bytecode: Vec<u8>, args: Vec<u8>) -> Self {
        Self {
            shard_id,
            bytecode,
            args,
            salt: Salt::default(),
            seqno: None,
            chain_id: None,
            await_policy: AwaitPolicy::Detached,
        }
    }
}

/// Result of a deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Address the contract lives at.
    pub address: Address,
    /// Deploy message hash.
    pub hash: Hash,
    /// Observed receipts, when a wait was requested.
    pub completion: Option<Completion>,
}

/// Wallet API - inbound port.
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Deploy the wallet contract itself at its derived address.
    async fn self_deploy(&self, params: SelfDeployParams) -> Result<DeployOutcome, WalletError>;

    /// Deploy a contract at the address derived from its code and salt.
    async fn deploy_contract(&self, params: DeployParams) -> Result<DeployOutcome, WalletError>;

    /// Submit and return immediately.
    async fn send_message(&self, params: SendParams) -> Result<Hash, WalletError>;

    /// Submit and wait for the originating shard's receipt.
    async fn sync_send_message(&self, params: SendParams) -> Result<Hash, WalletError>;
}

/// Funder API - inbound port.
#[async_trait]
pub trait FunderApi: Send + Sync {
    /// Top up `target` with `value`, retrying up to `max_attempts` times.
    async fn withdraw_with_retry(
        &self,
        target: Address,
        value: U256,
        max_attempts: u32,
    ) -> Result<Hash, WalletError>;
}
