//! Submission queue service tests: ordering, retries, worker lifecycle.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::primitives::U256;
use async_trait::async_trait;

use testnet_faucet::blockchain::{ChainError, ChainResult, SenderFactory, TransactionSender};
use testnet_faucet::clock::ManualClock;
use testnet_faucet::config::QueueConfig;
use testnet_faucet::ledger::{
    Ledger, MemoryLedger, NewTransaction, RecordId, TransactionStatus,
};
use testnet_faucet::queue::SubmissionQueue;

use common::{
    amount_wei, fast_queue_config, wait_until, FakeFactory, ScriptedSender, OTHER_WALLET, TX_HASH,
    WALLET,
};

struct Harness {
    queue: SubmissionQueue,
    ledger: Arc<MemoryLedger>,
    clock: Arc<ManualClock>,
}

fn harness(factory: Arc<FakeFactory>) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let ledger = Arc::new(MemoryLedger::new(clock.clone(), None));
    let queue = SubmissionQueue::new(fast_queue_config(), ledger.clone(), factory, clock.clone());
    Harness { queue, ledger, clock }
}

async fn pending(ledger: &MemoryLedger, wallet: &str) -> RecordId {
    ledger
        .create(NewTransaction::pending(wallet, "10.0.0.1", amount_wei()))
        .await
        .unwrap()
        .id
}

async fn status_of(ledger: &MemoryLedger, id: RecordId) -> TransactionStatus {
    ledger.get(id).await.unwrap().status
}

#[tokio::test]
async fn test_lower_priority_processed_first() {
    let sender = ScriptedSender::new(vec![]);
    let h = harness(FakeFactory::with_sender(sender.clone()));
    let normal = pending(&h.ledger, WALLET).await;
    let urgent = pending(&h.ledger, OTHER_WALLET).await;

    // The worker task cannot run until this test yields, so both are queued first.
    h.queue.enqueue(normal, WALLET, "10.0.0.1", 0);
    h.queue.enqueue(urgent, OTHER_WALLET, "10.0.0.1", -5);
    assert_eq!(h.queue.queue_size(), 2);

    assert!(wait_until(Duration::from_secs(2), || async { sender.sent_to().len() == 2 }).await);
    assert_eq!(sender.sent_to(), vec![OTHER_WALLET.to_string(), WALLET.to_string()]);

    h.queue.stop().await;
    let record = h.ledger.get(normal).await.unwrap();
    assert_eq!(record.status, TransactionStatus::Success);
    assert_eq!(record.transaction_hash.as_deref(), Some(TX_HASH));
}

#[tokio::test]
async fn test_recoverable_failure_retried_until_success() {
    let sender = ScriptedSender::new(vec![
        Err(ChainError::Connection("connection refused".into())),
        Err(ChainError::Timeout(10)),
    ]);
    let h = harness(FakeFactory::with_sender(sender.clone()));
    let id = pending(&h.ledger, WALLET).await;

    h.queue.enqueue(id, WALLET, "10.0.0.1", 0);
    assert!(
        wait_until(Duration::from_secs(2), || async {
            status_of(&h.ledger, id).await == TransactionStatus::Success
        })
        .await
    );
    h.queue.stop().await;

    let record = h.ledger.get(id).await.unwrap();
    assert_eq!(record.retry_count, 2);
    assert_eq!(record.priority, -1);
    assert!(record.error_message.is_none());
    assert_eq!(sender.sent_to().len(), 3);
    // One cooldown per recoverable failure.
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(5), Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let failures = (0..4)
        .map(|_| Err(ChainError::Connection("connection reset".into())))
        .collect();
    let sender = ScriptedSender::new(failures);
    let h = harness(FakeFactory::with_sender(sender.clone()));
    let id = pending(&h.ledger, WALLET).await;

    h.queue.enqueue(id, WALLET, "10.0.0.1", 0);
    assert!(wait_until(Duration::from_secs(2), || async { sender.sent_to().len() == 4 }).await);
    assert!(
        wait_until(Duration::from_secs(2), || async {
            status_of(&h.ledger, id).await == TransactionStatus::Failed
        })
        .await
    );
    h.queue.stop().await;

    let record = h.ledger.get(id).await.unwrap();
    assert_eq!(record.retry_count, 3);
    assert_eq!(record.error_message.as_deref(), Some("Connection error: connection reset"));
    assert_eq!(h.queue.queue_size(), 0);
}

#[tokio::test]
async fn test_stop_while_idle() {
    let sender = ScriptedSender::new(vec![]);
    let factory = FakeFactory::with_sender(sender.clone());
    let h = harness(factory.clone());
    let untouched = pending(&h.ledger, WALLET).await;
    let before = h.ledger.get(untouched).await.unwrap();

    h.queue.start();
    assert!(wait_until(Duration::from_secs(1), || async { factory.creates() == 1 }).await);
    assert!(h.queue.is_running());

    let started = Instant::now();
    h.queue.stop().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!h.queue.is_running());
    assert_eq!(h.ledger.get(untouched).await.unwrap(), before);
    assert!(sender.sent_to().is_empty());
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let sender = ScriptedSender::new(vec![]);
    let factory = FakeFactory::with_sender(sender);
    let h = harness(factory.clone());

    h.queue.start();
    h.queue.start();
    assert!(wait_until(Duration::from_millis(500), || async { factory.creates() >= 1 }).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(factory.creates(), 1);

    h.queue.stop().await;
}

#[tokio::test]
async fn test_unreachable_chain_stops_worker_cleanly() {
    let factory = FakeFactory::unreachable();
    let h = harness(factory.clone());
    let id = pending(&h.ledger, WALLET).await;

    h.queue.enqueue(id, WALLET, "10.0.0.1", 0);
    assert!(wait_until(Duration::from_secs(1), || async { !h.queue.is_running() }).await);

    assert_eq!(factory.creates(), 1);
    assert_eq!(status_of(&h.ledger, id).await, TransactionStatus::Pending);
    assert_eq!(h.queue.queue_size(), 1);
    h.queue.stop().await;
}

/// Sender whose submissions take real time, tracking how many overlap.
#[derive(Default)]
struct SlowSender {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent_to: Mutex<Vec<String>>,
}

#[async_trait]
impl TransactionSender for SlowSender {
    fn validate_address(&self, address: &str) -> bool {
        address.starts_with("0x") && address.len() == 42
    }

    async fn get_balance(&self) -> ChainResult<U256> {
        Ok(U256::MAX)
    }

    async fn send_transaction(&self, to_address: &str) -> ChainResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.sent_to.lock().unwrap().push(to_address.to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(TX_HASH.to_string())
    }
}

struct SlowFactory(Arc<SlowSender>);

#[async_trait]
impl SenderFactory for SlowFactory {
    async fn create(&self) -> ChainResult<Arc<dyn TransactionSender>> {
        Ok(Arc::clone(&self.0) as Arc<dyn TransactionSender>)
    }
}

#[tokio::test]
async fn test_restart_after_timed_out_stop_keeps_single_worker() {
    let sender = Arc::new(SlowSender {
        delay: Duration::from_millis(400),
        ..SlowSender::default()
    });
    let clock = Arc::new(ManualClock::default());
    let ledger = Arc::new(MemoryLedger::new(clock.clone(), None));
    let config = QueueConfig {
        join_timeout_ms: 50,
        ..fast_queue_config()
    };
    let queue = SubmissionQueue::new(
        config,
        ledger.clone(),
        Arc::new(SlowFactory(sender.clone())),
        clock,
    );
    let first = pending(&ledger, WALLET).await;
    let second = pending(&ledger, OTHER_WALLET).await;

    queue.enqueue(first, WALLET, "10.0.0.1", 0);
    assert!(
        wait_until(Duration::from_secs(1), || async {
            sender.in_flight.load(Ordering::SeqCst) == 1
        })
        .await
    );

    // The join times out while the first send is still in flight.
    queue.stop().await;
    assert!(queue.is_running());

    queue.enqueue(second, OTHER_WALLET, "10.0.0.1", 0);
    assert!(
        wait_until(Duration::from_secs(3), || async {
            status_of(&ledger, first).await == TransactionStatus::Success
                && status_of(&ledger, second).await == TransactionStatus::Success
        })
        .await
    );

    assert_eq!(sender.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(
        *sender.sent_to.lock().unwrap(),
        vec![WALLET.to_string(), OTHER_WALLET.to_string()]
    );
    queue.stop().await;
    assert!(!queue.is_running());
}
