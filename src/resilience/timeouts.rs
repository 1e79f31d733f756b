//! Timeout enforcement for RPC calls.

use std::future::IntoFuture;
use std::time::Duration;

use crate::blockchain::types::{ChainError, ChainResult};

/// Run an RPC future under a deadline.
///
/// RPC failures convert through `Into<ChainError>`; an expired deadline
/// becomes [`ChainError::Timeout`].
pub async fn with_timeout<T, E, F>(deadline: Duration, fut: F) -> ChainResult<T>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: Into<ChainError>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ChainError::Timeout(deadline.as_secs())),
    }
}
