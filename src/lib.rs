//! Testnet faucet: queued, failover-aware ETH disbursement.

pub mod blockchain;
pub mod clock;
pub mod config;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod queue;
pub mod resilience;
pub mod security;

pub use config::FaucetConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use queue::SubmissionQueue;
