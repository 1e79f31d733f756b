//! Shared fakes and helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use axum::extract::connect_info::MockConnectInfo;
use axum::Router;

use testnet_faucet::blockchain::{ChainError, ChainResult, SenderFactory, TransactionSender};
use testnet_faucet::clock::{Clock, ManualClock};
use testnet_faucet::config::{QueueConfig, ServerConfig};
use testnet_faucet::http::{build_router, AppState};
use testnet_faucet::ledger::MemoryLedger;
use testnet_faucet::queue::SubmissionQueue;
use testnet_faucet::security::RateLimiter;

pub const WALLET: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const OTHER_WALLET: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const TX_HASH: &str = "0x5656565656565656565656565656565656565656565656565656565656565656";

/// 0.0001 ether.
pub fn amount_wei() -> U256 {
    U256::from(100_000_000_000_000u64)
}

/// Sender returning scripted results, then `TX_HASH` once the script runs out.
pub struct ScriptedSender {
    results: Mutex<VecDeque<ChainResult<String>>>,
    sent_to: Mutex<Vec<String>>,
    balance: U256,
}

impl ScriptedSender {
    pub fn new(results: Vec<ChainResult<String>>) -> Arc<Self> {
        Self::with_balance(results, U256::from(10u64).pow(U256::from(18)))
    }

    pub fn with_balance(results: Vec<ChainResult<String>>, balance: U256) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            sent_to: Mutex::new(Vec::new()),
            balance,
        })
    }

    /// Destinations in submission order.
    pub fn sent_to(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSender for ScriptedSender {
    fn validate_address(&self, address: &str) -> bool {
        address.starts_with("0x") && address.len() == 42
    }

    async fn get_balance(&self) -> ChainResult<U256> {
        Ok(self.balance)
    }

    async fn send_transaction(&self, to_address: &str) -> ChainResult<String> {
        self.sent_to.lock().unwrap().push(to_address.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TX_HASH.to_string()))
    }
}

/// Factory handing out one shared sender, or failing when it has none.
pub struct FakeFactory {
    sender: Option<Arc<ScriptedSender>>,
    creates: AtomicUsize,
}

impl FakeFactory {
    pub fn with_sender(sender: Arc<ScriptedSender>) -> Arc<Self> {
        Arc::new(Self {
            sender: Some(sender),
            creates: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            sender: None,
            creates: AtomicUsize::new(0),
        })
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SenderFactory for FakeFactory {
    async fn create(&self) -> ChainResult<Arc<dyn TransactionSender>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        match &self.sender {
            Some(sender) => Ok(Arc::clone(sender) as Arc<dyn TransactionSender>),
            None => Err(ChainError::ConnectionUnavailable),
        }
    }
}

/// Queue settings with a short poll so tests stay fast.
pub fn fast_queue_config() -> QueueConfig {
    QueueConfig {
        poll_interval_ms: 50,
        join_timeout_ms: 1000,
        ..QueueConfig::default()
    }
}

/// Everything an API test needs to inspect after a request.
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<MemoryLedger>,
    pub queue: Arc<SubmissionQueue>,
    pub clock: Arc<ManualClock>,
    pub factory: Arc<FakeFactory>,
}

pub fn test_app(factory: Arc<FakeFactory>, queue_enabled: bool) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let ledger = Arc::new(MemoryLedger::new(clock.clone(), None));
    let queue = Arc::new(SubmissionQueue::new(
        fast_queue_config(),
        ledger.clone(),
        factory.clone(),
        clock.clone(),
    ));
    let state = AppState {
        ledger: ledger.clone(),
        queue: queue.clone(),
        rate_limiter: Arc::new(RateLimiter::new(Duration::from_secs(60), clock.clone())),
        senders: factory.clone(),
        clock: clock.clone() as Arc<dyn Clock>,
        amount_wei: amount_wei(),
        amount_eth: "0.0001".to_string(),
        queue_enabled,
    };
    let router = build_router(&ServerConfig::default(), state)
        .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

    TestApp {
        router,
        ledger,
        queue,
        clock,
        factory,
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
