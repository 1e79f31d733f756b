//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/fund:
//!     → address shape check (http handlers)
//!     → rate_limit.rs (per-IP, then per-wallet window)
//!     → enqueue
//! ```
//!
//! # Design Decisions
//! - A rejected request is still recorded in the ledger as failed
//! - The window starts only when a request is accepted

pub mod rate_limit;

pub use rate_limit::{RateLimitDecision, RateLimiter};
