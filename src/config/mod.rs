//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FaucetConfig (validated, immutable)
//!     → cloned per subsystem at startup
//! ```
//!
//! The signing key is never part of the file; it comes from the
//! `FAUCET_PRIVATE_KEY` environment variable (see `blockchain::wallet`).

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChainConfig, FaucetConfig, LedgerConfig, ObservabilityConfig, QueueConfig, RateLimitConfig,
    ServerConfig,
};
