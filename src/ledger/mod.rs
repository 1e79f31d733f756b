//! Transaction ledger.
//!
//! # Data Flow
//! ```text
//! HTTP fund request → create (pending | failed | success)
//! Queue worker      → get → update (success | failed | requeued)
//! Stats request     → count(status, since)
//! ```

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryLedger;
pub use types::{
    LedgerError, LedgerResult, NewTransaction, RecordId, RecordUpdate, TransactionRecord,
    TransactionStatus,
};

/// Record store. Writes must be visible to the next read from any task.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create(&self, new: NewTransaction) -> LedgerResult<TransactionRecord>;

    async fn get(&self, id: RecordId) -> LedgerResult<TransactionRecord>;

    async fn update(&self, id: RecordId, update: RecordUpdate) -> LedgerResult<TransactionRecord>;

    /// Records with `status` created at or after `since`.
    async fn count(&self, status: TransactionStatus, since: DateTime<Utc>) -> LedgerResult<usize>;
}
