//! The single consumer of the submission queue.
//!
//! # Per-item state machine
//! ```text
//! record missing            → log, drop
//! record not pending        → skip, no mutation
//! send ok                   → success (hash)
//! send err, terminal        → failed (error)
//! send err, recoverable     → failed, cooldown,
//!                             then if retry_count < max: pending, retry_count + 1,
//!                             pushed back at retry priority
//! ```

use std::sync::Arc;

use crate::blockchain::TransactionSender;
use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::ledger::{
    Ledger, LedgerError, LedgerResult, RecordUpdate, TransactionRecord, TransactionStatus,
};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::queue::item::WorkItem;
use crate::queue::priority::PriorityQueue;
use crate::resilience::{classify, ErrorClass};

/// What happened to one dequeued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Sent,
    Requeued,
    Failed,
    Skipped,
    Dropped,
}

impl ItemOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Sent => "success",
            ItemOutcome::Requeued => "requeued",
            ItemOutcome::Failed => "failed",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Dropped => "dropped",
        }
    }
}

pub struct Worker {
    queue: Arc<PriorityQueue>,
    ledger: Arc<dyn Ledger>,
    sender: Arc<dyn TransactionSender>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl Worker {
    pub fn new(
        queue: Arc<PriorityQueue>,
        ledger: Arc<dyn Ledger>,
        sender: Arc<dyn TransactionSender>,
        clock: Arc<dyn Clock>,
        config: QueueConfig,
    ) -> Self {
        Self {
            queue,
            ledger,
            sender,
            clock,
            config,
        }
    }

    /// Process items until `shutdown` fires.
    ///
    /// The signal is only observed between items, so an in-flight submission
    /// always completes.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!("Queue worker started");
        let stop = shutdown.wait();
        tokio::pin!(stop);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => break,
                item = self.queue.pop(self.config.poll_interval()) => item,
            };
            metrics::set_queue_depth(self.queue.len());

            let Some(item) = next else {
                continue;
            };
            if let Err(e) = self.process_item(item).await {
                tracing::error!(error = %e, "Error processing queue item");
                self.clock.sleep(self.config.error_pause()).await;
            }
        }

        tracing::info!("Queue worker stopped");
    }

    /// Handle one item. Only ledger failures escape.
    pub async fn process_item(&self, item: WorkItem) -> LedgerResult<ItemOutcome> {
        let outcome = self.reconcile(&item).await?;
        metrics::record_outcome(outcome.as_str());
        Ok(outcome)
    }

    async fn reconcile(&self, item: &WorkItem) -> LedgerResult<ItemOutcome> {
        let record = match self.ledger.get(item.record_id).await {
            Ok(record) => record,
            Err(LedgerError::NotFound(id)) => {
                tracing::error!(record_id = %id, "Transaction record not found, dropping item");
                return Ok(ItemOutcome::Dropped);
            }
            Err(e) => return Err(e),
        };

        if record.status != TransactionStatus::Pending {
            tracing::warn!(
                record_id = %record.id,
                status = %record.status,
                "Record no longer pending, skipping"
            );
            return Ok(ItemOutcome::Skipped);
        }

        tracing::info!(
            record_id = %record.id,
            to = %item.destination_address,
            retry_count = record.retry_count,
            "Processing transaction"
        );

        match self.sender.send_transaction(&item.destination_address).await {
            Ok(transaction_hash) => {
                tracing::info!(
                    record_id = %record.id,
                    tx_hash = %transaction_hash,
                    "Transaction sent"
                );
                self.ledger
                    .update(record.id, RecordUpdate::Succeeded { transaction_hash })
                    .await?;
                Ok(ItemOutcome::Sent)
            }
            Err(e) => self.handle_failure(item, &record, e.to_string()).await,
        }
    }

    async fn handle_failure(
        &self,
        item: &WorkItem,
        record: &TransactionRecord,
        error_message: String,
    ) -> LedgerResult<ItemOutcome> {
        let class = classify(&error_message);
        tracing::error!(
            record_id = %record.id,
            error = %error_message,
            recoverable = class == ErrorClass::Recoverable,
            "Transaction failed"
        );
        self.ledger
            .update(record.id, RecordUpdate::Failed { error_message })
            .await?;

        if class == ErrorClass::Terminal {
            return Ok(ItemOutcome::Failed);
        }

        self.clock.sleep(self.config.retry_cooldown()).await;

        if record.retry_count >= self.config.max_auto_retries {
            tracing::warn!(
                record_id = %record.id,
                retry_count = record.retry_count,
                "Retry budget exhausted"
            );
            return Ok(ItemOutcome::Failed);
        }

        let retry_count = record.retry_count + 1;
        let priority = self.config.retry_priority;
        self.ledger
            .update(record.id, RecordUpdate::Requeued { retry_count, priority })
            .await?;
        self.queue.push(item.retry(priority));
        metrics::record_enqueued(priority);
        tracing::info!(record_id = %record.id, retry_count, priority, "Transaction re-queued");
        Ok(ItemOutcome::Requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{ChainError, ChainResult};
    use crate::clock::ManualClock;
    use crate::ledger::{MemoryLedger, NewTransaction, RecordId};
    use alloy::primitives::U256;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const WALLET: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    #[derive(Default)]
    struct ScriptedSender {
        results: Mutex<VecDeque<ChainResult<String>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSender {
        fn returning(results: Vec<ChainResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TransactionSender for ScriptedSender {
        fn validate_address(&self, _address: &str) -> bool {
            true
        }

        async fn get_balance(&self) -> ChainResult<U256> {
            Ok(U256::ZERO)
        }

        async fn send_transaction(&self, _to_address: &str) -> ChainResult<String> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("0xfeed".to_string()))
        }
    }

    struct Harness {
        worker: Worker,
        queue: Arc<PriorityQueue>,
        ledger: Arc<MemoryLedger>,
        clock: Arc<ManualClock>,
    }

    fn harness(sender: Arc<ScriptedSender>) -> Harness {
        let clock = Arc::new(ManualClock::default());
        let queue = Arc::new(PriorityQueue::new());
        let ledger = Arc::new(MemoryLedger::new(clock.clone(), None));
        let worker = Worker::new(
            queue.clone(),
            ledger.clone(),
            sender,
            clock.clone(),
            QueueConfig::default(),
        );
        Harness {
            worker,
            queue,
            ledger,
            clock,
        }
    }

    async fn pending_record(ledger: &MemoryLedger, retry_count: u32) -> RecordId {
        let rec = ledger
            .create(NewTransaction::pending(WALLET, "10.0.0.1", U256::from(1)))
            .await
            .unwrap();
        if retry_count > 0 {
            ledger
                .update(rec.id, RecordUpdate::Requeued { retry_count, priority: -1 })
                .await
                .unwrap();
        }
        rec.id
    }

    #[tokio::test]
    async fn test_success_records_hash() {
        let sender = ScriptedSender::returning(vec![Ok("0xabc".into())]);
        let h = harness(sender.clone());
        let id = pending_record(&h.ledger, 0).await;

        let outcome = h
            .worker
            .process_item(WorkItem::new(id, WALLET, "10.0.0.1", 0))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Sent);

        let rec = h.ledger.get(id).await.unwrap();
        assert_eq!(rec.status, TransactionStatus::Success);
        assert_eq!(rec.transaction_hash.as_deref(), Some("0xabc"));
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_non_pending_record_is_not_mutated() {
        let sender = ScriptedSender::returning(vec![]);
        let h = harness(sender.clone());
        let rec = h
            .ledger
            .create(NewTransaction::failed(
                WALLET,
                "10.0.0.1",
                U256::from(1),
                "Rate limit exceeded",
            ))
            .await
            .unwrap();

        let outcome = h
            .worker
            .process_item(WorkItem::new(rec.id, WALLET, "10.0.0.1", 0))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Skipped);
        assert_eq!(sender.calls(), 0);
        assert_eq!(h.ledger.get(rec.id).await.unwrap(), rec);
    }

    #[tokio::test]
    async fn test_missing_record_is_dropped() {
        let sender = ScriptedSender::returning(vec![]);
        let h = harness(sender.clone());

        let outcome = h
            .worker
            .process_item(WorkItem::new(RecordId(99), WALLET, "10.0.0.1", 0))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Dropped);
        assert_eq!(sender.calls(), 0);
    }

    #[tokio::test]
    async fn test_recoverable_failure_requeues_at_boosted_priority() {
        let sender = ScriptedSender::returning(vec![Err(ChainError::Connection(
            "connection refused".into(),
        ))]);
        let h = harness(sender);
        let id = pending_record(&h.ledger, 2).await;

        let outcome = h
            .worker
            .process_item(WorkItem::new(id, WALLET, "10.0.0.1", 0))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Requeued);

        let rec = h.ledger.get(id).await.unwrap();
        assert_eq!(rec.status, TransactionStatus::Pending);
        assert_eq!(rec.retry_count, 3);
        assert_eq!(rec.priority, -1);
        assert!(rec.error_message.is_none());

        let requeued = h.queue.try_pop().unwrap();
        assert_eq!(requeued.record_id, id);
        assert_eq!(requeued.priority, -1);
        assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_recoverable_failure_with_exhausted_budget() {
        let sender = ScriptedSender::returning(vec![Err(ChainError::Timeout(10))]);
        let h = harness(sender);
        let id = pending_record(&h.ledger, 3).await;

        let outcome = h
            .worker
            .process_item(WorkItem::new(id, WALLET, "10.0.0.1", -1))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Failed);

        let rec = h.ledger.get(id).await.unwrap();
        assert_eq!(rec.status, TransactionStatus::Failed);
        assert_eq!(rec.retry_count, 3);
        assert_eq!(rec.error_message.as_deref(), Some("RPC timeout after 10 seconds"));
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_failure_is_not_retried() {
        let sender = ScriptedSender::returning(vec![Err(ChainError::InsufficientFunds {
            balance: U256::ZERO,
            required: U256::from(1),
        })]);
        let h = harness(sender);
        let id = pending_record(&h.ledger, 1).await;

        let outcome = h
            .worker
            .process_item(WorkItem::new(id, WALLET, "10.0.0.1", 0))
            .await
            .unwrap();
        assert_eq!(outcome, ItemOutcome::Failed);

        let rec = h.ledger.get(id).await.unwrap();
        assert_eq!(rec.status, TransactionStatus::Failed);
        assert_eq!(rec.retry_count, 1);
        assert!(rec.error_message.unwrap().starts_with("Insufficient funds"));
        assert!(h.queue.is_empty());
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_queue_and_stops() {
        let sender = ScriptedSender::returning(vec![]);
        let h = harness(sender.clone());
        let first = pending_record(&h.ledger, 0).await;
        let second = pending_record(&h.ledger, 0).await;
        h.queue.push(WorkItem::new(first, WALLET, "10.0.0.1", 0));
        h.queue.push(WorkItem::new(second, WALLET, "10.0.0.1", 0));

        let shutdown = Shutdown::new();
        let task = tokio::spawn(h.worker.run(shutdown.clone()));

        for _ in 0..100 {
            if sender.calls() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        assert_eq!(h.ledger.get(first).await.unwrap().status, TransactionStatus::Success);
        assert_eq!(h.ledger.get(second).await.unwrap().status, TransactionStatus::Success);
    }
}
