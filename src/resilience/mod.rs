//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC call from the chain client:
//!     → timeouts.rs (per-call deadline)
//!     → on transient failure: backoff.rs (delay, gas escalation)
//!
//! Failed submission in the queue worker:
//!     → retries.rs (recoverable vs terminal)
//! ```

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{classify, ErrorClass};
