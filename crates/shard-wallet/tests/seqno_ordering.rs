//! Seqno issuance: sequential sends and concurrent senders.

use primitive_types::U256;
use proptest::prelude::*;
use shard_wallet::domain::invariant_seqno_increasing;
use shard_wallet::{
    AccountClient, AccountParams, Address, InMemoryNode, MessageEnvelope, RlpAbiCodec,
    SendParams, SeqnoLedger, StaticSigner, WalletApi, WalletConfig, WalletError,
};
use std::sync::Arc;
use std::time::Duration;

fn funded_wallet(node: Arc<InMemoryNode>) -> AccountClient<InMemoryNode, StaticSigner> {
    let address = Address::from_parts(1, &[0x42; 18]);
    node.create_account(address, U256::from(1_000_000u64));
    AccountClient::new(
        AccountParams::at(address),
        node,
        StaticSigner::new(vec![0x02; 33]),
        Arc::new(RlpAbiCodec::new()),
        WalletConfig::for_testing(),
    )
    .unwrap()
}

fn submitted_seqnos(node: &InMemoryNode) -> Vec<u64> {
    node.submissions()
        .iter()
        .map(|raw| MessageEnvelope::decode(raw).unwrap().seqno())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_sequential_sends_increase_seqno(n in 1usize..20) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let node = Arc::new(InMemoryNode::new(1));
        let wallet = funded_wallet(node.clone());
        let recipient = Address::from_parts(2, &[0x01; 18]);

        runtime.block_on(async {
            for _ in 0..n {
                wallet
                    .send_message(SendParams::transfer(recipient, U256::one(), 1_000))
                    .await
                    .unwrap();
            }
        });

        let seqnos = submitted_seqnos(&node);
        prop_assert_eq!(seqnos.len(), n);
        prop_assert!(invariant_seqno_increasing(&seqnos));
        prop_assert_eq!(seqnos, (0..n as u64).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_collide_without_ledger() {
    let node = Arc::new(InMemoryNode::new(1));
    node.set_latency(Duration::from_millis(5));
    let wallet = funded_wallet(node.clone());
    let recipient = Address::from_parts(1, &[0x01; 18]);

    let (a, b) = tokio::join!(
        wallet.send_message(SendParams::transfer(recipient, U256::one(), 0)),
        wallet.send_message(SendParams::transfer(recipient, U256::one(), 0)),
    );

    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(WalletError::Submission(_))))
        .count();
    assert_eq!(rejected, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_serialised_by_ledger() {
    let node = Arc::new(InMemoryNode::new(1));
    node.set_latency(Duration::from_millis(5));
    let wallet = funded_wallet(node.clone()).with_seqno_ledger(Arc::new(SeqnoLedger::new()));
    let recipient = Address::from_parts(1, &[0x01; 18]);

    let (a, b, c) = tokio::join!(
        wallet.send_message(SendParams::transfer(recipient, U256::one(), 0)),
        wallet.send_message(SendParams::transfer(recipient, U256::one(), 0)),
        wallet.send_message(SendParams::transfer(recipient, U256::one(), 0)),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let mut seqnos = submitted_seqnos(&node);
    seqnos.sort_unstable();
    assert_eq!(seqnos, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_ledger_releases_failed_reservation() {
    let node = Arc::new(InMemoryNode::new(1));
    let ledger = Arc::new(SeqnoLedger::new());
    let wallet = funded_wallet(node.clone()).with_seqno_ledger(ledger.clone());
    let recipient = Address::from_parts(1, &[0x01; 18]);

    node.fail_next_submissions(1);
    let failed = wallet
        .send_message(SendParams::transfer(recipient, U256::one(), 0))
        .await;
    assert!(matches!(failed, Err(WalletError::Transport(_))));
    assert_eq!(ledger.last_committed(&wallet.address()), None);

    wallet
        .send_message(SendParams::transfer(recipient, U256::one(), 0))
        .await
        .unwrap();
    assert_eq!(submitted_seqnos(&node), vec![0, 0]);
    assert_eq!(ledger.last_committed(&wallet.address()), Some(0));
}
