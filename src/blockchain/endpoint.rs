//! A single JSON-RPC endpoint.
//!
//! [`ChainEndpoint`] is the narrow set of node calls the faucet needs.
//! [`HttpEndpoint`] implements it over alloy's HTTP provider with a per-call
//! deadline. [`EndpointConnector`] turns configured URLs into endpoints so the
//! client's failover logic can be exercised against fakes.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;

use crate::blockchain::types::{ChainError, ChainResult};
use crate::blockchain::wallet::is_valid_address;
use crate::resilience::timeouts::with_timeout;

/// Node calls used by the faucet.
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    /// URL this endpoint talks to.
    fn url(&self) -> &str;

    /// Liveness probe.
    async fn is_connected(&self) -> bool;

    /// Address format check.
    fn is_address(&self, address: &str) -> bool {
        is_valid_address(address)
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64>;

    async fn get_gas_price(&self) -> ChainResult<u128>;

    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<TxHash>;
}

/// Creates endpoints from URLs.
pub trait EndpointConnector: Send + Sync {
    fn connect(&self, url: &str) -> ChainResult<Arc<dyn ChainEndpoint>>;
}

/// Alloy HTTP provider with a deadline on every call.
pub struct HttpEndpoint {
    url: String,
    provider: Arc<dyn Provider + Send + Sync>,
    timeout: Duration,
}

impl HttpEndpoint {
    pub fn new(url: &str, timeout: Duration) -> ChainResult<Self> {
        let parsed: url::Url = url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL '{}': {}", url, e)))?;
        let provider = ProviderBuilder::new().connect_http(parsed);

        Ok(Self {
            url: url.to_string(),
            provider: Arc::new(provider),
            timeout,
        })
    }
}

impl std::fmt::Debug for HttpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEndpoint")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl ChainEndpoint for HttpEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn is_connected(&self) -> bool {
        match with_timeout(self.timeout, self.provider.get_chain_id()).await {
            Ok(chain_id) => {
                tracing::debug!(url = %self.url, chain_id, "RPC endpoint reachable");
                true
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "RPC endpoint unreachable");
                false
            }
        }
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        with_timeout(self.timeout, self.provider.get_balance(address)).await
    }

    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64> {
        with_timeout(self.timeout, self.provider.get_transaction_count(address)).await
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        with_timeout(self.timeout, self.provider.get_gas_price()).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<TxHash> {
        let pending = with_timeout(self.timeout, self.provider.send_raw_transaction(&raw)).await?;
        Ok(*pending.tx_hash())
    }
}

/// Connector producing [`HttpEndpoint`]s.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl EndpointConnector for HttpConnector {
    fn connect(&self, url: &str) -> ChainResult<Arc<dyn ChainEndpoint>> {
        Ok(Arc::new(HttpEndpoint::new(url, self.timeout)?))
    }
}
