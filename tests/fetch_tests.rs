//! Transaction page fetcher behavior: pagination, fallback, politeness

mod support;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dayfeed::transactions::fetch_block_transactions;
use support::{gateway, spawn_mock, MockLedger, MockTx};

const HEIGHT: u64 = 5;

fn many_txs(count: usize) -> Vec<MockTx> {
    (0..count).map(|i| MockTx::plain(&format!("tx-{:04}", i))).collect()
}

#[tokio::test]
async fn concatenates_all_pages_in_order() {
    // 250 transactions force three pages of 100.
    let ledger = Arc::new(
        MockLedger::new()
            .with_block(HEIGHT, 1000)
            .with_txs(HEIGHT, many_txs(250)),
    );
    let url = spawn_mock(Arc::clone(&ledger)).await;
    let gw = gateway(&url);

    let txs = fetch_block_transactions(&gw, HEIGHT, 100, Duration::ZERO).await;

    assert_eq!(txs.len(), 250);
    assert_eq!(ledger.primary_hits.load(Ordering::SeqCst), 3);
    assert_eq!(ledger.fallback_hits.load(Ordering::SeqCst), 0);

    // Arrival order is preserved and ids are duplicate-free, so the
    // concatenation equals the full upstream set.
    let ids: Vec<&str> = txs.iter().map(|tx| tx.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 250);
    assert_eq!(ids[0], "tx-0000");
    assert_eq!(ids[100], "tx-0100");
    assert_eq!(ids[249], "tx-0249");
}

#[tokio::test]
async fn page_failure_falls_back_to_one_reduced_request() {
    let ledger = Arc::new(
        MockLedger::new()
            .with_block(HEIGHT, 1000)
            .with_txs(HEIGHT, many_txs(250)),
    );
    ledger.fail_primary_pages.store(true, Ordering::SeqCst);
    let url = spawn_mock(Arc::clone(&ledger)).await;
    let gw = gateway(&url);

    let txs = fetch_block_transactions(&gw, HEIGHT, 100, Duration::ZERO).await;

    // Exactly the fallback page, no pagination retry afterwards.
    assert_eq!(txs.len(), 100);
    assert_eq!(txs[0].id, "tx-0000");
    assert_eq!(ledger.primary_hits.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.fallback_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fallback_failure_returns_empty_without_error() {
    let ledger = Arc::new(
        MockLedger::new()
            .with_block(HEIGHT, 1000)
            .with_txs(HEIGHT, many_txs(50)),
    );
    ledger.fail_primary_pages.store(true, Ordering::SeqCst);
    ledger.fail_fallback_pages.store(true, Ordering::SeqCst);
    let url = spawn_mock(Arc::clone(&ledger)).await;
    let gw = gateway(&url);

    let txs = fetch_block_transactions(&gw, HEIGHT, 100, Duration::ZERO).await;

    assert!(txs.is_empty());
    assert_eq!(ledger.fallback_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_results_do_not_trigger_fallback() {
    let ledger = Arc::new(MockLedger::new().with_block(HEIGHT, 1000));
    let url = spawn_mock(Arc::clone(&ledger)).await;
    let gw = gateway(&url);

    let txs = fetch_block_transactions(&gw, HEIGHT, 100, Duration::ZERO).await;

    assert!(txs.is_empty());
    assert_eq!(ledger.primary_hits.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.fallback_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn politeness_delay_separates_pages() {
    let ledger = Arc::new(
        MockLedger::new()
            .with_block(HEIGHT, 1000)
            .with_txs(HEIGHT, many_txs(250)),
    );
    let url = spawn_mock(Arc::clone(&ledger)).await;
    let gw = gateway(&url);

    let started = Instant::now();
    let txs = fetch_block_transactions(&gw, HEIGHT, 100, Duration::from_millis(50)).await;
    let elapsed = started.elapsed();

    assert_eq!(txs.len(), 250);
    // Three pages mean two inter-page delays.
    assert!(
        elapsed >= Duration::from_millis(100),
        "expected >= 100ms with two 50ms delays, got {:?}",
        elapsed
    );

    let times = ledger.page_times.lock().unwrap();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(50));
    }
}
