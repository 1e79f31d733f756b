//! Submission queue subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/fund
//!     → service.rs (enqueue, start worker if idle)
//!     → priority.rs (lowest priority first, FIFO within a priority)
//!     → worker.rs (single consumer: ledger lookup, send, reconcile)
//!         → recoverable failure: cooldown, push back at retry priority
//! ```
//!
//! # Design Decisions
//! - Exactly one worker, so the funding account's nonce is never raced
//! - Stop is checked between items; an in-flight send always completes
//! - Retries are pushed straight onto the shared queue by the worker

pub mod item;
pub mod priority;
pub mod service;
pub mod worker;

pub use item::{WorkItem, NORMAL_PRIORITY};
pub use priority::PriorityQueue;
pub use service::SubmissionQueue;
pub use worker::{ItemOutcome, Worker};
