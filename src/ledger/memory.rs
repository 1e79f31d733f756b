//! In-memory ledger with optional JSON persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::clock::Clock;
use crate::ledger::types::{
    LedgerError, LedgerResult, NewTransaction, RecordId, RecordUpdate, TransactionRecord,
    TransactionStatus,
};
use crate::ledger::Ledger;

/// Thread-safe record store keyed by [`RecordId`].
#[derive(Clone)]
pub struct MemoryLedger {
    records: Arc<DashMap<RecordId, TransactionRecord>>,
    next_id: Arc<AtomicU64>,
    persistence_path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    /// Empty ledger. Ids start at 1.
    pub fn new(clock: Arc<dyn Clock>, persistence_path: Option<PathBuf>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            persistence_path,
            clock,
        }
    }

    /// Load records from `path` if it exists. Later saves go back to `path`.
    pub fn load_from_file(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let ledger = Self::new(clock, Some(path.to_path_buf()));
        if path.exists() {
            let file = File::open(path).map_err(storage_error)?;
            let records: Vec<TransactionRecord> =
                serde_json::from_reader(BufReader::new(file)).map_err(storage_error)?;

            let max_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
            for record in records {
                ledger.records.insert(record.id, record);
            }
            ledger.next_id.store(max_id + 1, Ordering::SeqCst);
            tracing::info!(
                path = %path.display(),
                records = ledger.records.len(),
                "Loaded transaction records"
            );
        }
        Ok(ledger)
    }

    /// Write all records to the persistence path, if one is set.
    pub fn save_to_file(&self) -> LedgerResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let mut records: Vec<TransactionRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.id);

        let file = File::create(path).map_err(storage_error)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records).map_err(storage_error)?;
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "Saved transaction records"
        );
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn storage_error(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("records", &self.records.len())
            .field("persistence_path", &self.persistence_path)
            .finish()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create(&self, new: NewTransaction) -> LedgerResult<TransactionRecord> {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = self.clock.now();
        let record = TransactionRecord {
            id,
            wallet_address: new.wallet_address,
            ip_address: new.ip_address,
            amount: new.amount,
            status: new.status,
            transaction_hash: new.transaction_hash,
            error_message: new.error_message,
            retry_count: 0,
            priority: new.priority,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(id, record.clone());
        tracing::debug!(record_id = %id, status = %record.status, "Created transaction record");
        Ok(record)
    }

    async fn get(&self, id: RecordId) -> LedgerResult<TransactionRecord> {
        self.records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(LedgerError::NotFound(id))
    }

    async fn update(&self, id: RecordId, update: RecordUpdate) -> LedgerResult<TransactionRecord> {
        let now = self.clock.now();
        let mut entry = self.records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        entry.apply(update, now);
        Ok(entry.clone())
    }

    async fn count(&self, status: TransactionStatus, since: DateTime<Utc>) -> LedgerResult<usize> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.status == status && r.created_at >= since)
            .count())
    }
}
