//! Per-IP and per-wallet request windows.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::clock::Clock;
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RateKey {
    Ip(String),
    Wallet(String),
}

impl RateKey {
    fn wallet(address: &str) -> Self {
        RateKey::Wallet(address.to_lowercase())
    }

    fn kind(&self) -> &'static str {
        match self {
            RateKey::Ip(_) => "ip",
            RateKey::Wallet(_) => "wallet",
        }
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { remaining_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitDecision::Limited { .. })
    }
}

/// One funded request per IP and per wallet within the window.
pub struct RateLimiter {
    last_request: DashMap<RateKey, DateTime<Utc>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_request: DashMap::new(),
            window,
            clock,
        }
    }

    /// Check the IP first, then the wallet.
    pub fn check(&self, ip_address: &str, wallet_address: &str) -> RateLimitDecision {
        let now = self.clock.now();
        for key in [RateKey::Ip(ip_address.to_string()), RateKey::wallet(wallet_address)] {
            if let Some(remaining_secs) = self.remaining(&key, now) {
                tracing::warn!(
                    key = key.kind(),
                    ip = %ip_address,
                    wallet = %wallet_address,
                    remaining_secs,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(key.kind());
                return RateLimitDecision::Limited { remaining_secs };
            }
        }
        RateLimitDecision::Allowed
    }

    /// Start a new window for both the IP and the wallet.
    pub fn record(&self, ip_address: &str, wallet_address: &str) {
        let now = self.clock.now();
        self.last_request.insert(RateKey::Ip(ip_address.to_string()), now);
        self.last_request.insert(RateKey::wallet(wallet_address), now);
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.window_delta();
        let before = self.last_request.len();
        self.last_request.retain(|_, last| now - *last < window);
        before - self.last_request.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_request.len()
    }

    fn remaining(&self, key: &RateKey, now: DateTime<Utc>) -> Option<u64> {
        let last = *self.last_request.get(key)?;
        let elapsed = (now - last).num_seconds().max(0) as u64;
        let window = self.window.as_secs();
        (elapsed < window).then(|| window - elapsed)
    }

    fn window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}
