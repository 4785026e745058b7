//! Library layer for FundPilot: real-time polling, freshness, persisted
//! UI state, and pluggable market data sources.
//!
//! Wraps the `fundpilot_api` client with a market-hours-aware poller and the
//! stores the dashboard reads from.

pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod freshness;
pub mod i18n;
pub mod market_hours;
pub mod poller;
pub mod source;
pub mod storage;
pub mod store;
pub mod validation;

pub use fundpilot_api;
pub use fundpilot_api::types;
pub use fundpilot_api::{ApiError, Client, ClientConfig, ErrorCode};

pub use config::AppConfig;
pub use dashboard::DashboardRefresher;
pub use error::FundPilotError;
pub use freshness::{FreshnessReport, FreshnessStatus};
pub use i18n::Language;
pub use market_hours::MarketHours;
pub use poller::{Poller, PollerConfig, RefreshOutcome, RefreshState, Refresher};
pub use source::{ApiDataSource, MarketDataSource, MockDataSource};
pub use storage::LocalStorage;
pub use store::{FundStore, LanguageStore, SettingsStore, ThemeMode, ThemeStore};
