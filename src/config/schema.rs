//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the faucet.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the faucet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// HTTP API settings.
    pub server: ServerConfig,

    /// Blockchain client settings.
    pub chain: ChainConfig,

    /// Submission queue and worker tuning.
    pub queue: QueueConfig,

    /// Per-IP / per-wallet request window.
    pub rate_limit: RateLimitConfig,

    /// Transaction ledger storage.
    pub ledger: LedgerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
            max_body_size: 16 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Blockchain client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Primary JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Fallback JSON-RPC endpoint URLs, tried in order.
    pub fallback_urls: Vec<String>,

    /// Chain ID used for EIP-155 signing (11155111 for Sepolia).
    pub chain_id: u64,

    /// Faucet wallet address. Derived from the private key when empty.
    pub from_address: String,

    /// Amount sent per request, in ether (decimal string).
    pub amount_eth: String,

    /// Attempts per RPC operation before the error is surfaced.
    pub max_retries: u32,

    /// Base delay between attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas limit for a plain value transfer.
    pub gas_limit: u64,
}

impl ChainConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Primary first, then fallbacks in configured order.
    pub fn endpoint_urls(&self) -> Vec<String> {
        std::iter::once(self.rpc_url.clone())
            .chain(self.fallback_urls.iter().cloned())
            .collect()
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            fallback_urls: Vec::new(),
            chain_id: 11_155_111,
            from_address: String::new(),
            amount_eth: "0.0001".to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            rpc_timeout_secs: 10,
            gas_limit: 21_000,
        }
    }
}

/// Submission queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Process fund requests through the background queue.
    /// When false, requests submit synchronously.
    pub enabled: bool,

    /// Bounded wait on an empty queue before re-checking the stop signal.
    pub poll_interval_ms: u64,

    /// Pause before a recoverable failure is re-enqueued.
    pub retry_cooldown_ms: u64,

    /// Automatic retries allowed per transaction.
    pub max_auto_retries: u32,

    /// Priority assigned to automatic retries (lower runs first).
    pub retry_priority: i32,

    /// How long `stop` waits for the worker to exit.
    pub join_timeout_ms: u64,

    /// Pause after an unexpected error in the worker loop.
    pub error_pause_ms: u64,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_millis(self.retry_cooldown_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.error_pause_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 5000,
            retry_cooldown_ms: 5000,
            max_auto_retries: 3,
            retry_priority: -1,
            join_timeout_ms: 5000,
            error_pause_ms: 1000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Seconds an IP or wallet must wait between requests.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Effective window; zero when limiting is disabled.
    pub fn window(&self) -> Duration {
        if self.enabled {
            Duration::from_secs(self.window_secs)
        } else {
            Duration::ZERO
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON file the ledger is loaded from and saved to on shutdown.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
