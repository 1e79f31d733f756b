//! Faucet API handlers.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use alloy::primitives::utils::format_ether;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::ChainError;
use crate::http::request::{client_ip, request_id};
use crate::http::server::AppState;
use crate::ledger::{LedgerError, NewTransaction, RecordId, TransactionStatus};
use crate::queue::NORMAL_PRIORITY;
use crate::security::RateLimitDecision;

const INVALID_ADDRESS: &str = "Invalid Ethereum wallet address format";
const CHAIN_UNAVAILABLE: &str = "Unable to connect to Ethereum network";

/// Errors returned to API clients as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FundResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction_hash: Option<String>,
    pub transaction_id: RecordId,
    pub wallet_address: String,
    /// Ether, as configured.
    pub amount: String,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub include_wallet_info: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    pub successful_transactions: usize,
    pub failed_transactions: usize,
    pub pending_transactions: usize,
    pub queue_size: usize,
    pub time_period: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub faucet_balance: Option<f64>,
}

/// Shape check only: `0x` prefix and 42 characters.
fn is_wallet_shaped(address: &str) -> bool {
    address.starts_with("0x") && address.len() == 42
}

/// `POST /api/fund`
pub async fn fund(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<FundRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FundResponse>), ApiError> {
    let wallet_address = match payload {
        Ok(Json(req)) if is_wallet_shaped(&req.wallet_address) => req.wallet_address,
        Ok(_) => return Err(ApiError::BadRequest(INVALID_ADDRESS.to_string())),
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };
    let ip_address = client_ip(&headers, peer);
    tracing::info!(
        request_id = %request_id(&headers),
        wallet = %wallet_address,
        ip = %ip_address,
        "Fund request"
    );

    if let RateLimitDecision::Limited { remaining_secs } =
        state.rate_limiter.check(&ip_address, &wallet_address)
    {
        let message = format!(
            "Rate limit exceeded. Please try again in {} seconds.",
            remaining_secs
        );
        state
            .ledger
            .create(NewTransaction::failed(
                &wallet_address,
                &ip_address,
                state.amount_wei,
                &message,
            ))
            .await?;
        return Err(ApiError::RateLimited(message));
    }

    if state.queue_enabled {
        enqueue_funding(&state, wallet_address, ip_address).await
    } else {
        send_funding(&state, wallet_address, ip_address).await
    }
}

async fn enqueue_funding(
    state: &AppState,
    wallet_address: String,
    ip_address: String,
) -> Result<(StatusCode, Json<FundResponse>), ApiError> {
    state.rate_limiter.record(&ip_address, &wallet_address);
    let record = state
        .ledger
        .create(NewTransaction::pending(&wallet_address, &ip_address, state.amount_wei))
        .await?;
    state
        .queue
        .enqueue(record.id, &wallet_address, &ip_address, NORMAL_PRIORITY);

    Ok((
        StatusCode::ACCEPTED,
        Json(FundResponse {
            transaction_hash: None,
            transaction_id: record.id,
            wallet_address,
            amount: state.amount_eth.clone(),
            status: TransactionStatus::Pending,
            message: Some("Transaction submitted for processing".to_string()),
        }),
    ))
}

async fn send_funding(
    state: &AppState,
    wallet_address: String,
    ip_address: String,
) -> Result<(StatusCode, Json<FundResponse>), ApiError> {
    let sender = match state.senders.create().await {
        Ok(sender) => sender,
        Err(e) => {
            tracing::error!(error = %e, "Blockchain client unavailable");
            let message = record_failure(
                state,
                &wallet_address,
                &ip_address,
                CHAIN_UNAVAILABLE.to_string(),
            )
            .await?;
            return Err(ApiError::Unavailable(message));
        }
    };

    match sender.send_transaction(&wallet_address).await {
        Ok(transaction_hash) => {
            state.rate_limiter.record(&ip_address, &wallet_address);
            let record = state
                .ledger
                .create(NewTransaction::succeeded(
                    &wallet_address,
                    &ip_address,
                    state.amount_wei,
                    &transaction_hash,
                ))
                .await?;
            Ok((
                StatusCode::OK,
                Json(FundResponse {
                    transaction_hash: Some(transaction_hash),
                    transaction_id: record.id,
                    wallet_address: wallet_address.clone(),
                    amount: state.amount_eth.clone(),
                    status: TransactionStatus::Success,
                    message: None,
                }),
            ))
        }
        Err(e @ (ChainError::InvalidAddress(_) | ChainError::InsufficientFunds { .. })) => {
            let message = record_failure(state, &wallet_address, &ip_address, e.to_string()).await?;
            Err(ApiError::BadRequest(message))
        }
        Err(e) => {
            tracing::error!(error = %e, "Error processing transaction");
            let message = record_failure(
                state,
                &wallet_address,
                &ip_address,
                format!("Transaction failed: {}", e),
            )
            .await?;
            Err(ApiError::Internal(message))
        }
    }
}

/// Store a failed record for a rejected request and hand the message back.
async fn record_failure(
    state: &AppState,
    wallet_address: &str,
    ip_address: &str,
    message: String,
) -> Result<String, ApiError> {
    state
        .ledger
        .create(NewTransaction::failed(wallet_address, ip_address, state.amount_wei, &message))
        .await?;
    Ok(message)
}

/// `GET /api/stats`
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let since = state.clock.now() - TimeDelta::hours(24);
    let mut response = StatsResponse {
        successful_transactions: state.ledger.count(TransactionStatus::Success, since).await?,
        failed_transactions: state.ledger.count(TransactionStatus::Failed, since).await?,
        pending_transactions: state.ledger.count(TransactionStatus::Pending, since).await?,
        queue_size: state.queue.queue_size(),
        time_period: "24 hours".to_string(),
        faucet_balance: None,
    };

    let wants_balance = query
        .include_wallet_info
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if wants_balance {
        response.faucet_balance = faucet_balance(&state).await;
    }
    Ok(Json(response))
}

async fn faucet_balance(state: &AppState) -> Option<f64> {
    let result = match state.senders.create().await {
        Ok(sender) => sender.get_balance().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(wei) => format_ether(wei).parse().ok(),
        Err(e) => {
            tracing::error!(error = %e, "Error getting faucet balance");
            None
        }
    }
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_shape() {
        assert!(is_wallet_shaped("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_wallet_shaped("70997970C51812dc3A010C7d01b50e0d17dc79C8aa"));
        assert!(!is_wallet_shaped("0x1234"));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::RateLimited("x".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::Unavailable("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
        let from_ledger: ApiError = LedgerError::Storage("disk full".into()).into();
        assert_eq!(from_ledger.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
