//! Retry delay and fee escalation schedules.
//!
//! Transaction submission backs off exponentially while balance lookups use a
//! constant delay. The two schedules are intentionally separate functions.

use std::time::Duration;

/// Delay after failed submission attempt `attempt` (zero-based):
/// `base × 2^attempt`.
pub fn exponential_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Delay between balance lookup attempts; does not grow.
pub fn constant_delay(base: Duration, _attempt: u32) -> Duration {
    base
}

/// Gas price for attempt `attempt`: +10% of the network price per retry.
pub fn bump_gas_price(gas_price: u128, attempt: u32) -> u128 {
    gas_price.saturating_mul(10 + attempt as u128) / 10
}
