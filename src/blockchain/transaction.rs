//! Faucet transfer construction.
//!
//! A faucet payout is always a plain value transfer: fixed amount, fixed gas
//! limit, empty calldata, legacy gas pricing.

use alloy::consensus::TxLegacy;
use alloy::primitives::{Address, Bytes, TxKind, U256};

use crate::resilience::backoff::bump_gas_price;

/// Fixed parameters of every faucet transfer.
#[derive(Debug, Clone)]
pub struct TransferTemplate {
    /// Amount of native token to send, in wei.
    pub value: U256,
    /// Gas limit for a simple transfer.
    pub gas_limit: u64,
    /// Chain ID for EIP-155 signing.
    pub chain_id: u64,
}

impl TransferTemplate {
    /// Build the unsigned transfer for one submission attempt.
    ///
    /// # Arguments
    /// * `to` - Destination address
    /// * `nonce` - Sender nonce fetched for this attempt
    /// * `network_gas_price` - Gas price reported by the node, in wei
    /// * `attempt` - Zero-based attempt index; later attempts pay more gas
    pub fn build(
        &self,
        to: Address,
        nonce: u64,
        network_gas_price: u128,
        attempt: u32,
    ) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price: bump_gas_price(network_gas_price, attempt),
            gas_limit: self.gas_limit,
            to: TxKind::Call(to),
            value: self.value,
            input: Bytes::new(),
        }
    }
}
