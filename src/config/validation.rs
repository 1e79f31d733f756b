//! Configuration validation.
//!
//! Semantic checks run after serde has accepted the file. All problems are
//! collected and returned together.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::FaucetConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid URL in {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("chain.amount_eth is not a valid ether amount: {0}")]
    InvalidAmount(String),

    #[error("chain.from_address is not a valid address: {0}")]
    InvalidFromAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid socket address in {field}: {value}")]
    InvalidBindAddress { field: &'static str, value: String },
}

/// Validate a loaded configuration.
pub fn validate_config(config: &FaucetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if url::Url::parse(&config.chain.rpc_url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "chain.rpc_url",
            value: config.chain.rpc_url.clone(),
        });
    }
    for fallback in &config.chain.fallback_urls {
        if url::Url::parse(fallback).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "chain.fallback_urls",
                value: fallback.clone(),
            });
        }
    }

    if parse_ether(&config.chain.amount_eth).is_err() {
        errors.push(ValidationError::InvalidAmount(config.chain.amount_eth.clone()));
    }

    if !config.chain.from_address.is_empty()
        && config.chain.from_address.parse::<Address>().is_err()
    {
        errors.push(ValidationError::InvalidFromAddress(
            config.chain.from_address.clone(),
        ));
    }

    if config.chain.max_retries == 0 {
        errors.push(ValidationError::Zero("chain.max_retries"));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero("chain.rpc_timeout_secs"));
    }
    if config.queue.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("queue.poll_interval_ms"));
    }
    if config.rate_limit.enabled && config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.window_secs"));
    }

    if config
        .server
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::InvalidBindAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidBindAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
