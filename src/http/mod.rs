//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, client IP)
//!     → handlers.rs (fund, stats, health)
//!         → rate limiter → ledger → submission queue
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use handlers::ApiError;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer};
