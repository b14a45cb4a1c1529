//! # Seqno Ledger
//!
//! Serialises seqno issuance per account. A send holds the account's slot
//! from seqno lookup until the node accepts (or rejects) the envelope, so two
//! concurrent sends from one account can never be built with the same seqno.
//!
//! Slots are kept until `prune` drops the idle ones; a ledger shared by
//! many short-lived accounts should be pruned periodically.

use crate::domain::Address;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<Option<u64>>>;

/// Per-account queue of pending seqnos.
#[derive(Default)]
pub struct SeqnoLedger {
    accounts: Mutex<HashMap<Address, Slot>>,
}

impl SeqnoLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `address`'s seqno.
    ///
    /// Waiters are served in FIFO order.
    pub async fn acquire(&self, address: Address) -> SeqnoReservation {
        let slot = self.accounts.lock().entry(address).or_default().clone();
        SeqnoReservation {
            guard: slot.lock_owned().await,
        }
    }

    /// Last seqno committed for `address`, if no send currently holds it.
    pub fn last_committed(&self, address: &Address) -> Option<u64> {
        let slot = self.accounts.lock().get(address).cloned()?;
        slot.try_lock().ok().and_then(|last| *last)
    }

    /// Drop slots that no reservation holds or waits on. Returns how many
    /// were removed.
    ///
    /// A pruned account's next send trusts the node's live seqno again, so
    /// prune only once the node has caught up with committed sends.
    pub fn prune(&self) -> usize {
        let mut accounts = self.accounts.lock();
        let before = accounts.len();
        accounts.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - accounts.len()
    }

    /// Number of tracked accounts.
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Whether no account is tracked.
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }
}

/// Exclusive hold on one account's seqno.
///
/// Dropping it without `commit` releases the slot and leaves the last
/// committed seqno untouched.
pub struct SeqnoReservation {
    guard: OwnedMutexGuard<Option<u64>>,
}

impl SeqnoReservation {
    /// Seqno to use given the node's `live` value: `max(live, last + 1)`.
    pub fn next(&self, live: u64) -> u64 {
        match *self.guard {
            Some(last) => live.max(last.saturating_add(1)),
            None => live,
        }
    }

    /// Record `seqno` as accepted by the node.
    pub fn commit(mut self, seqno: u64) {
        *self.guard = Some(seqno);
    }
}
