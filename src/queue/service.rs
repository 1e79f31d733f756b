//! Submission queue service: shared queue plus the worker task that drains it.

use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};

use crate::blockchain::SenderFactory;
use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::ledger::{Ledger, RecordId};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::queue::item::WorkItem;
use crate::queue::priority::PriorityQueue;
use crate::queue::worker::Worker;

struct RunningWorker {
    shutdown: Shutdown,
    /// Liveness of the task, kept after a timed-out join hands off `handle`.
    task: AbortHandle,
    /// Taken by the first `stop()` that joins.
    handle: Option<JoinHandle<()>>,
}

impl RunningWorker {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Accepts work from request handlers and owns the single worker.
pub struct SubmissionQueue {
    config: QueueConfig,
    queue: Arc<PriorityQueue>,
    ledger: Arc<dyn Ledger>,
    factory: Arc<dyn SenderFactory>,
    clock: Arc<dyn Clock>,
    worker: Mutex<Option<RunningWorker>>,
    /// One permit, held by whichever worker task is submitting.
    active: Arc<Semaphore>,
}

impl SubmissionQueue {
    pub fn new(
        config: QueueConfig,
        ledger: Arc<dyn Ledger>,
        factory: Arc<dyn SenderFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            queue: Arc::new(PriorityQueue::new()),
            ledger,
            factory,
            clock,
            worker: Mutex::new(None),
            active: Arc::new(Semaphore::new(1)),
        }
    }

    /// Spawn the worker unless one is already running. Must be called from
    /// within a tokio runtime.
    ///
    /// A worker that is still finishing its last item after `stop()` keeps the
    /// permit; the replacement waits for it before touching the queue.
    pub fn start(&self) {
        let mut slot = self.lock_worker();
        if slot
            .as_ref()
            .is_some_and(|w| w.is_alive() && !w.shutdown.is_triggered())
        {
            return;
        }

        let shutdown = Shutdown::new();
        let queue = Arc::clone(&self.queue);
        let ledger = Arc::clone(&self.ledger);
        let factory = Arc::clone(&self.factory);
        let clock = Arc::clone(&self.clock);
        let active = Arc::clone(&self.active);
        let config = self.config.clone();
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            let stop = signal.wait();
            let _permit = tokio::select! {
                biased;
                _ = stop => return,
                permit = active.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let sender = match factory.create().await {
                Ok(sender) => sender,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to initialize blockchain client, worker exiting"
                    );
                    return;
                }
            };
            Worker::new(queue, ledger, sender, clock, config)
                .run(signal)
                .await;
        });

        *slot = Some(RunningWorker {
            shutdown,
            task: handle.abort_handle(),
            handle: Some(handle),
        });
        tracing::info!("Transaction queue worker starting");
    }

    /// Signal the worker and wait up to the join timeout for it to exit.
    ///
    /// On timeout the worker is left to finish its in-flight item and still
    /// counts as running until it does.
    pub async fn stop(&self) {
        let (shutdown, handle) = {
            let mut slot = self.lock_worker();
            let Some(worker) = slot.as_mut() else {
                return;
            };
            (worker.shutdown.clone(), worker.handle.take())
        };
        shutdown.trigger();
        let Some(handle) = handle else {
            return;
        };

        let join_timeout = self.config.join_timeout();
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => tracing::info!("Transaction queue worker stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Transaction queue worker panicked"),
            Err(_) => tracing::warn!(
                timeout_ms = join_timeout.as_millis() as u64,
                "Worker did not stop within timeout, it will exit after its current item"
            ),
        }
    }

    /// Queue a pending record and make sure the worker is running.
    pub fn enqueue(
        &self,
        record_id: RecordId,
        wallet_address: &str,
        ip_address: &str,
        priority: i32,
    ) {
        self.queue
            .push(WorkItem::new(record_id, wallet_address, ip_address, priority));
        metrics::record_enqueued(priority);
        metrics::set_queue_depth(self.queue.len());
        tracing::info!(
            record_id = %record_id,
            wallet = %wallet_address,
            priority,
            "Transaction enqueued"
        );
        self.start();
    }

    /// Items waiting, not counting one the worker is processing.
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.lock_worker().as_ref().is_some_and(RunningWorker::is_alive)
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<RunningWorker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SubmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionQueue")
            .field("queue_size", &self.queue_size())
            .field("running", &self.is_running())
            .finish()
    }
}
