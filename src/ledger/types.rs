//! Ledger records and errors.

use std::fmt;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier assigned by the ledger when a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a funding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One funding request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub wallet_address: String,
    pub ip_address: String,
    /// Transfer amount in wei.
    pub amount: U256,
    pub status: TransactionStatus,
    /// Set only once the transfer was accepted by a node.
    pub transaction_hash: Option<String>,
    /// Set only while the record is `failed`.
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// Priority of the most recent enqueue.
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Apply a state transition, stamping `updated_at`.
    pub fn apply(&mut self, update: RecordUpdate, now: DateTime<Utc>) {
        match update {
            RecordUpdate::Succeeded { transaction_hash } => {
                self.status = TransactionStatus::Success;
                self.transaction_hash = Some(transaction_hash);
                self.error_message = None;
            }
            RecordUpdate::Failed { error_message } => {
                self.status = TransactionStatus::Failed;
                self.error_message = Some(error_message);
            }
            RecordUpdate::Requeued {
                retry_count,
                priority,
            } => {
                self.status = TransactionStatus::Pending;
                self.error_message = None;
                // Never decreases.
                self.retry_count = self.retry_count.max(retry_count);
                self.priority = priority;
            }
        }
        self.updated_at = now;
    }
}

/// Fields supplied by the caller when creating a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub wallet_address: String,
    pub ip_address: String,
    pub amount: U256,
    pub status: TransactionStatus,
    pub transaction_hash: Option<String>,
    pub error_message: Option<String>,
    pub priority: i32,
}

impl NewTransaction {
    /// A request waiting for the worker.
    pub fn pending(wallet_address: &str, ip_address: &str, amount: U256) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            ip_address: ip_address.to_string(),
            amount,
            status: TransactionStatus::Pending,
            transaction_hash: None,
            error_message: None,
            priority: 0,
        }
    }

    /// A request rejected before reaching the chain.
    pub fn failed(
        wallet_address: &str,
        ip_address: &str,
        amount: U256,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: TransactionStatus::Failed,
            error_message: Some(error.into()),
            ..Self::pending(wallet_address, ip_address, amount)
        }
    }

    /// A request funded synchronously.
    pub fn succeeded(
        wallet_address: &str,
        ip_address: &str,
        amount: U256,
        transaction_hash: impl Into<String>,
    ) -> Self {
        Self {
            status: TransactionStatus::Success,
            transaction_hash: Some(transaction_hash.into()),
            ..Self::pending(wallet_address, ip_address, amount)
        }
    }
}

/// Transitions the worker applies to an existing record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    /// `pending → success`.
    Succeeded { transaction_hash: String },
    /// `pending → failed`.
    Failed { error_message: String },
    /// `failed → pending` for an automatic retry. Clears the error message.
    Requeued { retry_count: u32, priority: i32 },
}

/// Ledger failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Transaction record {0} not found")]
    NotFound(RecordId),

    #[error("Ledger storage error: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
