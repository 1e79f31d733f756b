//! Chain-specific types and error definitions.

use std::error::Error as StdError;

use alloy::primitives::U256;
use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// No configured endpoint answered the liveness probe.
    #[error("Connection unavailable: failed to connect to any Ethereum node")]
    ConnectionUnavailable,

    /// Destination is not a well-formed address.
    #[error("Invalid Ethereum address format: {0}")]
    InvalidAddress(String),

    /// Faucet balance is below the transfer amount.
    #[error("Insufficient funds in faucet wallet: balance {balance} wei, need {required} wei")]
    InsufficientFunds { balance: U256, required: U256 },

    /// The request never got an answer from the node.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The node answered with a JSON-RPC error or an unreadable payload.
    #[error("Node rejected request: {0}")]
    Node(String),

    /// Any other RPC client failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain settings that cannot be turned into a transfer.
    #[error("Invalid chain configuration: {0}")]
    Config(String),
}

impl ChainError {
    /// Whether the chain client may retry the call on another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Connection(_) | ChainError::Timeout(_))
    }
}

impl From<RpcError<TransportErrorKind>> for ChainError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match &err {
            RpcError::Transport(kind) => ChainError::Connection(error_chain(kind)),
            RpcError::ErrorResp(payload) => {
                ChainError::Node(format!("{} (code {})", payload.message, payload.code))
            }
            RpcError::SerError(_) | RpcError::DeserError { .. } => {
                ChainError::Node(error_chain(&err))
            }
            _ => ChainError::Rpc(error_chain(&err)),
        }
    }
}

/// Join an error with its sources, skipping causes already in the message.
///
/// HTTP client errors put the useful part ("Connection refused") in a nested
/// source, not in the top-level message.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Result type for blockchain operations.
pub type ChainResult<T> = Result<T, ChainError>;
