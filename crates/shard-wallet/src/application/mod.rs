//! # Application Layer
//!
//! Services implementing the inbound ports.

pub mod funder;
pub mod seqno;
pub mod wallet;

pub use funder::RetryingFunder;
pub use seqno::{SeqnoLedger, SeqnoReservation};
pub use wallet::{AccountClient, AccountParams};
