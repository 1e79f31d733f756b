//! Connection-resilient faucet client.
//!
//! # Responsibilities
//! - Pick a live endpoint: primary first, then fallbacks in order
//! - Query the faucet balance with constant-delay retries
//! - Build, sign and submit transfers with exponential backoff,
//!   a fresh nonce per attempt and gas escalation on retries
//! - Re-select the endpoint whenever a retry is about to happen

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, TxHash, U256};
use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::blockchain::endpoint::{ChainEndpoint, EndpointConnector};
use crate::blockchain::transaction::TransferTemplate;
use crate::blockchain::types::{ChainError, ChainResult};
use crate::blockchain::wallet::Wallet;
use crate::clock::Clock;
use crate::config::ChainConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{constant_delay, exponential_delay};

/// What the submission worker and the HTTP layer need from the chain.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    fn validate_address(&self, address: &str) -> bool;

    /// Faucet wallet balance in wei.
    async fn get_balance(&self) -> ChainResult<U256>;

    /// Send the configured amount to `to_address`; returns the tx hash.
    async fn send_transaction(&self, to_address: &str) -> ChainResult<String>;
}

/// Builds a connected [`TransactionSender`].
#[async_trait]
pub trait SenderFactory: Send + Sync {
    async fn create(&self) -> ChainResult<Arc<dyn TransactionSender>>;
}

/// Faucet blockchain client with endpoint failover.
pub struct ChainClient {
    connector: Arc<dyn EndpointConnector>,
    /// Primary first, then fallbacks.
    urls: Vec<String>,
    /// Currently active endpoint.
    ///
    /// Single-writer: only the caller that observes a connectivity failure
    /// swaps it, and in the faucet that is always the one queue worker.
    /// `ArcSwap` keeps concurrent readers (stats requests) safe regardless.
    active: ArcSwap<Arc<dyn ChainEndpoint>>,
    wallet: Wallet,
    sender: Address,
    template: TransferTemplate,
    max_retries: u32,
    retry_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl ChainClient {
    /// Create a client connected to the first reachable endpoint.
    ///
    /// # Errors
    /// [`ChainError::ConnectionUnavailable`] when neither the primary nor any
    /// fallback answers the liveness probe.
    pub async fn connect(
        config: &ChainConfig,
        wallet: Wallet,
        connector: Arc<dyn EndpointConnector>,
        clock: Arc<dyn Clock>,
    ) -> ChainResult<Self> {
        let value = parse_ether(&config.amount_eth).map_err(|e| {
            ChainError::Config(format!("invalid amount '{}': {}", config.amount_eth, e))
        })?;
        let sender = wallet.address();
        if !config.from_address.is_empty() {
            let configured: Address = config.from_address.parse().map_err(|e| {
                ChainError::Config(format!(
                    "invalid from_address '{}': {}",
                    config.from_address, e
                ))
            })?;
            // Balance and nonce are read for `sender`, so it must be the signer.
            if configured != sender {
                return Err(ChainError::Config(format!(
                    "from_address {} does not match signing key address {}",
                    configured, sender
                )));
            }
        }

        let urls = config.endpoint_urls();
        let endpoint = first_reachable(connector.as_ref(), &urls).await.map_err(|e| {
            tracing::error!("Failed to connect to any Ethereum node");
            e
        })?;

        Ok(Self {
            connector,
            urls,
            active: ArcSwap::from_pointee(endpoint),
            template: TransferTemplate {
                value,
                gas_limit: config.gas_limit,
                chain_id: wallet.chain_id(),
            },
            wallet,
            sender,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            clock,
        })
    }

    /// URL of the endpoint currently in use.
    pub fn active_url(&self) -> String {
        self.endpoint().url().to_string()
    }

    /// Faucet wallet address.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Amount sent per request, in wei.
    pub fn amount(&self) -> U256 {
        self.template.value
    }

    pub fn validate_address(&self, address: &str) -> bool {
        self.endpoint().is_address(address)
    }

    /// Get the faucet balance, retrying transient failures with a constant delay.
    pub async fn get_balance(&self) -> ChainResult<U256> {
        let mut attempt = 0;
        loop {
            match self.endpoint().get_balance(self.sender).await {
                Ok(balance) => return Ok(balance),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Error getting balance"
                    );
                    if !e.is_transient() || attempt + 1 >= self.max_retries {
                        return Err(e);
                    }
                    self.reselect_endpoint().await;
                    self.clock
                        .sleep(constant_delay(self.retry_delay, attempt))
                        .await;
                    attempt += 1;
                }
            }
        }
    }

    /// Send the configured amount to `to_address`.
    ///
    /// Address and balance problems fail immediately. Transient RPC errors
    /// are retried up to `max_retries` attempts with exponential backoff.
    pub async fn send_transaction(&self, to_address: &str) -> ChainResult<String> {
        let result = self.try_send(to_address).await;
        if let Err(e) = &result {
            tracing::error!(to = %to_address, error = %e, "Error sending transaction");
        }
        result
    }

    async fn try_send(&self, to_address: &str) -> ChainResult<String> {
        if !self.validate_address(to_address) {
            return Err(ChainError::InvalidAddress(to_address.to_string()));
        }
        let to: Address = to_address
            .parse()
            .map_err(|_| ChainError::InvalidAddress(to_address.to_string()))?;

        let balance = self.get_balance().await?;
        if balance < self.template.value {
            return Err(ChainError::InsufficientFunds {
                balance,
                required: self.template.value,
            });
        }

        let mut attempt = 0;
        loop {
            match self.submit_attempt(to, attempt).await {
                Ok(tx_hash) => {
                    tracing::info!(
                        to = %to,
                        tx_hash = %tx_hash,
                        attempt = attempt + 1,
                        "Transaction submitted"
                    );
                    return Ok(tx_hash.to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Error sending transaction"
                    );
                    if !e.is_transient() || attempt + 1 >= self.max_retries {
                        return Err(e);
                    }
                    self.reselect_endpoint().await;
                    let wait = exponential_delay(self.retry_delay, attempt);
                    tracing::info!(wait_ms = wait.as_millis() as u64, "Retrying transaction");
                    self.clock.sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One submission attempt. The nonce is read fresh every time so a nonce
    /// consumed by an earlier attempt is never reused.
    async fn submit_attempt(&self, to: Address, attempt: u32) -> ChainResult<TxHash> {
        let endpoint = self.endpoint();
        let nonce = endpoint.get_transaction_count(self.sender).await?;
        let gas_price = endpoint.get_gas_price().await?;

        let tx = self.template.build(to, nonce, gas_price, attempt);
        tracing::debug!(nonce, gas_price = tx.gas_price, attempt, "Signing transfer");
        let raw = self.wallet.sign_transaction(tx)?;

        endpoint.send_raw_transaction(raw).await
    }

    fn endpoint(&self) -> Arc<dyn ChainEndpoint> {
        let guard = self.active.load();
        Arc::clone(&**guard)
    }

    /// Run endpoint selection again; keep the current endpoint if none answers.
    async fn reselect_endpoint(&self) {
        match first_reachable(self.connector.as_ref(), &self.urls).await {
            Ok(endpoint) => self.active.store(Arc::new(endpoint)),
            Err(e) => tracing::warn!(
                current = %self.endpoint().url(),
                error = %e,
                "Endpoint reselection failed, keeping current endpoint"
            ),
        }
    }
}

/// Probe `urls` in order and return the first reachable endpoint.
async fn first_reachable(
    connector: &dyn EndpointConnector,
    urls: &[String],
) -> ChainResult<Arc<dyn ChainEndpoint>> {
    for (idx, url) in urls.iter().enumerate() {
        if idx > 0 {
            tracing::warn!(url = %url, "Trying fallback Ethereum node");
        }
        let endpoint = match connector.connect(url) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping unusable RPC endpoint");
                continue;
            }
        };

        let healthy = endpoint.is_connected().await;
        metrics::record_endpoint_health(url, healthy);
        if healthy {
            if idx == 0 {
                tracing::info!(url = %url, "Connected to primary Ethereum node");
            } else {
                tracing::info!(url = %url, "Connected to fallback Ethereum node");
                metrics::record_failover(url);
            }
            return Ok(endpoint);
        }
    }
    Err(ChainError::ConnectionUnavailable)
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("active_url", &self.active_url())
            .field("sender", &self.sender)
            .field("chain_id", &self.template.chain_id)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl TransactionSender for ChainClient {
    fn validate_address(&self, address: &str) -> bool {
        ChainClient::validate_address(self, address)
    }

    async fn get_balance(&self) -> ChainResult<U256> {
        ChainClient::get_balance(self).await
    }

    async fn send_transaction(&self, to_address: &str) -> ChainResult<String> {
        ChainClient::send_transaction(self, to_address).await
    }
}

/// Creates [`ChainClient`]s from configuration.
pub struct ChainClientFactory {
    config: ChainConfig,
    wallet: Wallet,
    connector: Arc<dyn EndpointConnector>,
    clock: Arc<dyn Clock>,
}

impl ChainClientFactory {
    pub fn new(
        config: ChainConfig,
        wallet: Wallet,
        connector: Arc<dyn EndpointConnector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            wallet,
            connector,
            clock,
        }
    }
}

#[async_trait]
impl SenderFactory for ChainClientFactory {
    async fn create(&self) -> ChainResult<Arc<dyn TransactionSender>> {
        let client = ChainClient::connect(
            &self.config,
            self.wallet.clone(),
            Arc::clone(&self.connector),
            Arc::clone(&self.clock),
        )
        .await?;
        Ok(Arc::new(client))
    }
}
