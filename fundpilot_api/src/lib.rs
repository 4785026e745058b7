//! Typed REST client for the FundPilot backend.
//!
//! [`Client`] injects the session token, normalizes every failure into an
//! [`ApiError`], and retries transient failures with exponential backoff.

pub mod auth;
mod client;
mod errors;
mod funds;
mod query;
pub mod types;
pub use self::auth::{LogSessionHandler, MemoryTokenStore, SessionHandler, TokenStore, TOKEN_KEY};
pub use self::client::{
    Client, ClientConfig, Request, RequestOptions, RetryPolicy, DEFAULT_BASE_URL,
    DEFAULT_LOGIN_ROUTE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY, DEFAULT_TIMEOUT,
};
pub use self::errors::{ApiError, ErrorCode};
pub use self::funds::{FundsApi, DEFAULT_METRICS_PERIOD, DEFAULT_SEARCH_LIMIT};
pub use self::query::{FundDataParams, FundSearchParams, Query, TechnicalIndicatorParams};
pub use reqwest::Method;
