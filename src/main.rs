//! Testnet Faucet (v1)
//!
//! Disburses a fixed amount of test ETH per request, rate limited per IP and
//! per wallet, through a single background submission worker.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/fund ──▶ http ──▶ rate limiter ──▶ ledger (pending)
//!                                                      │
//!                                                      ▼
//!                                         queue (priority, FIFO ties)
//!                                                      │
//!                                                      ▼
//!                                         worker ──▶ chain client ──▶ RPC primary
//!                                            │            │       └─▶ RPC fallbacks
//!                                            ▼            ▼
//!                                 ledger (success/failed)  retries, gas bump
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use clap::Parser;
use tokio::net::TcpListener;

use testnet_faucet::blockchain::{ChainClientFactory, HttpConnector, SenderFactory, Wallet};
use testnet_faucet::clock::{Clock, SystemClock};
use testnet_faucet::config::{self, FaucetConfig};
use testnet_faucet::http::{AppState, HttpServer};
use testnet_faucet::ledger::MemoryLedger;
use testnet_faucet::lifecycle::{signals, Shutdown};
use testnet_faucet::observability::{logging, metrics};
use testnet_faucet::queue::SubmissionQueue;
use testnet_faucet::security::RateLimiter;

#[derive(Parser)]
#[command(name = "testnet-faucet", version, about = "Testnet ETH faucet server")]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => FaucetConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("testnet-faucet v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        rpc_url = %config.chain.rpc_url,
        fallbacks = config.chain.fallback_urls.len(),
        chain_id = config.chain.chain_id,
        queue_enabled = config.queue.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let wallet = Wallet::from_env(config.chain.chain_id)?;
    let amount_wei = parse_ether(&config.chain.amount_eth)?;

    let ledger = Arc::new(match &config.ledger.persistence_path {
        Some(path) => MemoryLedger::load_from_file(path, Arc::clone(&clock))?,
        None => MemoryLedger::new(Arc::clone(&clock), None),
    });
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.window(), Arc::clone(&clock)));
    let senders: Arc<dyn SenderFactory> = Arc::new(ChainClientFactory::new(
        config.chain.clone(),
        wallet,
        Arc::new(HttpConnector::new(config.chain.rpc_timeout())),
        Arc::clone(&clock),
    ));
    let queue = Arc::new(SubmissionQueue::new(
        config.queue.clone(),
        ledger.clone(),
        Arc::clone(&senders),
        Arc::clone(&clock),
    ));
    if config.queue.enabled {
        queue.start();
    }

    let shutdown = Shutdown::new();
    tokio::spawn(signals::wait_for_signal(shutdown.clone()));
    tokio::spawn(purge_rate_limits(Arc::clone(&rate_limiter), shutdown.clone()));

    let state = AppState {
        ledger: ledger.clone(),
        queue: Arc::clone(&queue),
        rate_limiter,
        senders,
        clock,
        amount_wei,
        amount_eth: config.chain.amount_eth.clone(),
        queue_enabled: config.queue.enabled,
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    HttpServer::new(&config.server, state)
        .run(listener, shutdown.clone())
        .await?;

    queue.stop().await;
    if let Err(e) = ledger.save_to_file() {
        tracing::error!(error = %e, "Failed to persist ledger");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Drop expired rate-limit entries once a minute until shutdown.
async fn purge_rate_limits(limiter: Arc<RateLimiter>, shutdown: Shutdown) {
    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    let stop = shutdown.wait();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired rate-limit entries");
                }
            }
            _ = &mut stop => break,
        }
    }
}
