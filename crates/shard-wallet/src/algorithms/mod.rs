//! # Algorithms Module
//!
//! Address derivation, receipt-chain polling and retry classification.

pub mod address;
pub mod receipt_waiter;
pub mod retry;

pub use address::{derive_address, shard_of, AddressDeriver};
pub use receipt_waiter::{wait_for_origin, wait_until_completed, ReceiptWaiter};
pub use retry::{classify_completion, decide, AttemptOutcome, RetryDecision};
