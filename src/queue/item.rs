//! Queued work.

use chrono::{DateTime, Utc};

use crate::ledger::RecordId;

/// Priority of a fresh submission.
pub const NORMAL_PRIORITY: i32 = 0;

/// One pending funding request waiting for the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub record_id: RecordId,
    pub destination_address: String,
    pub requester_ip: String,
    /// Lower sorts first.
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(
        record_id: RecordId,
        destination_address: &str,
        requester_ip: &str,
        priority: i32,
    ) -> Self {
        Self {
            record_id,
            destination_address: destination_address.to_string(),
            requester_ip: requester_ip.to_string(),
            priority,
            enqueued_at: Utc::now(),
        }
    }

    /// Same request, re-submitted at `priority`.
    pub fn retry(&self, priority: i32) -> Self {
        Self::new(self.record_id, &self.destination_address, &self.requester_ip, priority)
    }
}
