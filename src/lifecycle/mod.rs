//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting → queue worker exits at next poll
//!             → ledger persisted
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
