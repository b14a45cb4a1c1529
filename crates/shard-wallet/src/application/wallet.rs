//! # Account Client
//!
//! Application service for one smart-contract account: builds, signs and
//! submits envelopes, deploys itself and other contracts, and applies an
//! `AwaitPolicy` after every submission.

use crate::algorithms::{wait_for_origin, wait_until_completed, AddressDeriver};
use crate::application::seqno::SeqnoLedger;
use crate::config::WalletConfig;
use crate::domain::{
    invariant_shard_in_range, invariant_submittable, AbiValue, AccountState, Address,
    AwaitPolicy, BlockTag, Completion, DeployPayload, Hash, MessageEnvelope, Salt, ShardId,
    WalletError, DEFAULT_SALT,
};
use crate::ports::{
    AbiCodec, DeployOutcome, DeployParams, NodeRpc, SelfDeployParams, SendParams, Signer,
    WalletApi, WALLET_ASYNC_CALL, WALLET_SYNC_CALL,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How an account is identified.
///
/// Either `address` or `shard_id` must be present. With only a shard the
/// address is derived from the public key, salt and init code.
#[derive(Clone, Debug, Default)]
pub struct AccountParams {
    /// Public key; defaults to the signer's.
    pub public_key: Option<Vec<u8>>,
    /// Known address.
    pub address: Option<Address>,
    /// Home shard.
    pub shard_id: Option<ShardId>,
    /// Derivation salt; defaults to `DEFAULT_SALT`.
    pub salt: Option<Salt>,
    /// Wallet contract code.
    pub init_code: Vec<u8>,
}

impl AccountParams {
    /// Account derived on `shard_id` from `init_code`.
    pub fn derived(shard_id: ShardId, init_code: Vec<u8>) -> Self {
        Self {
            shard_id: Some(shard_id),
            init_code,
            ..Default::default()
        }
    }

    /// Account at a known address.
    pub fn at(address: Address) -> Self {
        Self {
            address: Some(address),
            ..Default::default()
        }
    }

    /// Override the salt.
    pub fn with_salt(mut self, salt: Salt) -> Self {
        self.salt = Some(salt);
        self
    }
}

/// Client for one smart-contract account.
pub struct AccountClient<R: NodeRpc, S: Signer> {
    rpc: Arc<R>,
    signer: S,
    codec: Arc<dyn AbiCodec>,
    config: WalletConfig,
    deriver: AddressDeriver,
    public_key: Vec<u8>,
    address: Address,
    salt: Salt,
    init_code: Vec<u8>,
    state: Mutex<AccountState>,
    ledger: Option<Arc<SeqnoLedger>>,
}

impl<R: NodeRpc, S: Signer> AccountClient<R, S> {
    /// Create a client, resolving the account address.
    pub fn new(
        params: AccountParams,
        rpc: Arc<R>,
        signer: S,
        codec: Arc<dyn AbiCodec>,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        config.validate()?;
        let deriver = AddressDeriver::new(config.shard_count)?;
        let public_key = params.public_key.unwrap_or_else(|| signer.public_key());
        let salt = params.salt.unwrap_or(DEFAULT_SALT);

        let address = match (params.address, params.shard_id) {
            (Some(address), shard_id) => {
                invariant_shard_in_range(address.shard_id(), config.shard_count)?;
                if let Some(shard_id) = shard_id {
                    if address.shard_id() != shard_id {
                        return Err(WalletError::Configuration(format!(
                            "address {} lives on shard {}, not {}",
                            address,
                            address.shard_id(),
                            shard_id
                        )));
                    }
                }
                if let Some(salt) = params.salt {
                    let shard_id = shard_id.unwrap_or(address.shard_id());
                    let derived =
                        deriver.derive(&public_key, shard_id, &salt, &params.init_code)?;
                    if derived != address {
                        return Err(WalletError::Configuration(format!(
                            "address {} does not match derived {}",
                            address, derived
                        )));
                    }
                }
                address
            }
            (None, Some(shard_id)) => {
                deriver.derive(&public_key, shard_id, &salt, &params.init_code)?
            }
            (None, None) => {
                return Err(WalletError::Configuration(
                    "either an address or a shard id is required".into(),
                ));
            }
        };

        debug!(address = %address, shard = address.shard_id(), "Account client created");

        Ok(Self {
            rpc,
            signer,
            codec,
            config,
            deriver,
            public_key,
            address,
            salt,
            init_code: params.init_code,
            state: Mutex::new(AccountState::Uninitialized),
            ledger: None,
        })
    }

    /// Serialise seqno issuance through `ledger`.
    pub fn with_seqno_ledger(mut self, ledger: Arc<SeqnoLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Home shard.
    pub fn shard_id(&self) -> ShardId {
        self.address.shard_id()
    }

    /// Public key the address was derived from.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Derivation salt.
    pub fn salt(&self) -> Salt {
        self.salt
    }

    /// Local lifecycle view.
    pub fn state(&self) -> AccountState {
        *self.state.lock()
    }

    /// Configuration.
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Node handle.
    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    /// Encode, submit and return the node's message hash.
    pub async fn submit(&self, envelope: &MessageEnvelope) -> Result<Hash, WalletError> {
        invariant_submittable(envelope)?;
        let raw = envelope.encode()?;
        let hash = self.rpc.submit_raw_message(&raw).await?;
        info!(
            hash = %hex::encode(hash),
            to = %envelope.to(),
            seqno = envelope.seqno(),
            deploy = envelope.is_deploy(),
            "Message submitted"
        );
        Ok(hash)
    }

    /// Apply `policy` to a submitted message.
    pub async fn dispatch(
        &self,
        shard_id: ShardId,
        hash: Hash,
        policy: AwaitPolicy,
    ) -> Result<Option<Completion>, WalletError> {
        let wait = &self.config.receipts;
        let completion = match policy {
            AwaitPolicy::Detached => return Ok(None),
            AwaitPolicy::OriginHop => {
                match wait_for_origin(self.rpc.as_ref(), shard_id, hash, wait).await? {
                    Some(receipt) => Completion::Complete(vec![receipt]),
                    None => Completion::TimedOut,
                }
            }
            AwaitPolicy::FullChain => {
                wait_until_completed(self.rpc.as_ref(), shard_id, hash, wait).await?
            }
        };
        debug!(
            hash = %hex::encode(hash),
            complete = completion.is_complete(),
            receipts = completion.receipts().len(),
            "Await finished"
        );
        Ok(Some(completion))
    }

    /// Call `function` on this account's own contract.
    pub async fn call(
        &self,
        function: &str,
        args: &[AbiValue],
        seqno: Option<u64>,
        chain_id: Option<u64>,
    ) -> Result<Hash, WalletError> {
        let data = self.codec.encode_call(function, args)?;
        let address = self.address;
        self.sign_and_submit(address, seqno, chain_id, |seqno, chain_id| {
            Ok(MessageEnvelope::call(address, chain_id, seqno, data))
        })
        .await
    }

    async fn resolve_chain_id(&self, explicit: Option<u64>) -> Result<u64, WalletError> {
        match explicit.or(self.config.chain_id) {
            Some(chain_id) => Ok(chain_id),
            None => self.rpc.get_chain_id().await,
        }
    }

    async fn sign_and_submit<F>(
        &self,
        target: Address,
        seqno: Option<u64>,
        chain_id: Option<u64>,
        build: F,
    ) -> Result<Hash, WalletError>
    where
        F: FnOnce(u64, u64) -> Result<MessageEnvelope, WalletError> + Send,
    {
        let reservation = match &self.ledger {
            Some(ledger) => Some(ledger.acquire(target).await),
            None => None,
        };

        let seqno = match seqno {
            Some(seqno) => seqno,
            None => {
                let live = self.rpc.get_seqno(&target, BlockTag::Pending).await?;
                reservation.as_ref().map_or(live, |r| r.next(live))
            }
        };
        let chain_id = self.resolve_chain_id(chain_id).await?;

        let mut envelope = build(seqno, chain_id)?;
        envelope.sign(&self.signer)?;
        debug!(
            hash = %hex::encode(envelope.hash()),
            to = %target,
            seqno,
            chain_id,
            "Envelope signed"
        );

        let hash = self.submit(&envelope).await?;
        if let Some(reservation) = reservation {
            reservation.commit(seqno);
        }
        Ok(hash)
    }

    /// Send through the wallet contract's `function` entry point, then
    /// apply `policy`.
    async fn send_via(
        &self,
        function: &str,
        params: SendParams,
        policy: AwaitPolicy,
    ) -> Result<(Hash, Option<Completion>), WalletError> {
        let args = [
            AbiValue::Address(params.to),
            AbiValue::Uint(params.value),
            AbiValue::Uint(U256::from(params.gas)),
            AbiValue::Bytes(params.data),
        ];
        let hash = self
            .call(function, &args, params.seqno, params.chain_id)
            .await?;
        let completion = self.dispatch(self.shard_id(), hash, policy).await?;
        Ok((hash, completion))
    }

    fn mark_deployed(&self) {
        let mut state = self.state.lock();
        if state.can_transition_to(AccountState::Deployed) {
            *state = AccountState::Deployed;
            info!(address = %self.address, "Account deployed");
        }
    }
}

#[async_trait]
impl<R: NodeRpc, S: Signer> WalletApi for AccountClient<R, S> {
    async fn self_deploy(&self, params: SelfDeployParams) -> Result<DeployOutcome, WalletError> {
        if self.state() == AccountState::Deployed {
            warn!(address = %self.address, "Account already deployed, submitting anyway");
        }
        let payload = DeployPayload::new(self.init_code.clone(), Vec::new(), self.salt);
        let address = self.address;
        let hash = self
            .sign_and_submit(address, params.seqno, params.chain_id, |seqno, chain_id| {
                Ok(MessageEnvelope::deploy(address, chain_id, seqno, &payload))
            })
            .await?;
        self.mark_deployed();

        let completion = self
            .dispatch(address.shard_id(), hash, params.await_policy)
            .await?;
        Ok(DeployOutcome {
            address,
            hash,
            completion,
        })
    }

    async fn deploy_contract(&self, params: DeployParams) -> Result<DeployOutcome, WalletError> {
        let payload = DeployPayload::new(params.bytecode, params.args, params.salt);
        let address = self
            .deriver
            .derive_for_payload(&self.public_key, params.shard_id, &payload)?;
        info!(address = %address, shard = params.shard_id, "Deploying contract");

        let hash = self
            .sign_and_submit(address, params.seqno, params.chain_id, |seqno, chain_id| {
                Ok(MessageEnvelope::deploy(address, chain_id, seqno, &payload))
            })
            .await?;

        let completion = self
            .dispatch(address.shard_id(), hash, params.await_policy)
            .await?;
        Ok(DeployOutcome {
            address,
            hash,
            completion,
        })
    }

    async fn send_message(&self, params: SendParams) -> Result<Hash, WalletError> {
        let (hash, _) = self
            .send_via(WALLET_ASYNC_CALL, params, AwaitPolicy::Detached)
            .await?;
        Ok(hash)
    }

    async fn sync_send_message(&self, params: SendParams) -> Result<Hash, WalletError> {
        let (hash, completion) = self
            .send_via(WALLET_SYNC_CALL, params, AwaitPolicy::OriginHop)
            .await?;
        match completion.as_ref().and_then(|c| c.receipts().first()) {
            None => Err(WalletError::ConfirmationTimeout { hash }),
            Some(receipt) if !receipt.success => Err(WalletError::ExecutionFailure {
                hash,
                reason: receipt
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "execution failed".to_string()),
            }),
            Some(_) => Ok(hash),
        }
    }
}
