//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, signing)
//! Config (primary + fallback RPC URLs)
//!     → endpoint.rs (one node, per-call deadline)
//!     → client.rs (failover, retries, nonce + gas per attempt)
//!     → transaction.rs (legacy transfer template)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod endpoint;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainClient, ChainClientFactory, SenderFactory, TransactionSender};
pub use endpoint::{ChainEndpoint, EndpointConnector, HttpConnector, HttpEndpoint};
pub use types::{ChainError, ChainResult};
pub use wallet::Wallet;
