//! Environment-driven configuration.
//!
//! Values come from the process environment, after loading a `.env` file if
//! one exists. Unparseable numbers fall back to their defaults.

use std::path::PathBuf;
use std::time::Duration;

use fundpilot_api::ClientConfig;

use crate::error::FundPilotError;

pub const ENV_API_BASE_URL: &str = "FUNDPILOT_API_BASE_URL";
pub const ENV_API_TIMEOUT_MS: &str = "FUNDPILOT_API_TIMEOUT_MS";
pub const ENV_RETRY_MAX: &str = "FUNDPILOT_RETRY_MAX";
pub const ENV_RETRY_BASE_MS: &str = "FUNDPILOT_RETRY_BASE_MS";
pub const ENV_STORAGE_PATH: &str = "FUNDPILOT_STORAGE_PATH";
pub const ENV_MARKET_DATA_API_KEY: &str = "FUNDPILOT_MARKET_DATA_API_KEY";

/// Everything the binary needs to wire up a client, storage and data source.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub storage_path: PathBuf,
    pub market_data_api_key: Option<String>,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the environment.
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let defaults = ClientConfig::default();
        let client = ClientConfig {
            base_url: env_string(ENV_API_BASE_URL).unwrap_or(defaults.base_url),
            timeout: Duration::from_millis(env_u64(
                ENV_API_TIMEOUT_MS,
                defaults.timeout.as_millis() as u64,
            )),
            max_retries: env_u32(ENV_RETRY_MAX, defaults.max_retries),
            retry_base_delay: Duration::from_millis(env_u64(
                ENV_RETRY_BASE_MS,
                defaults.retry_base_delay.as_millis() as u64,
            )),
            login_route: defaults.login_route,
        };
        Self {
            client,
            storage_path: env_string(ENV_STORAGE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_storage_path),
            market_data_api_key: env_string(ENV_MARKET_DATA_API_KEY),
        }
    }

    /// Whether a real market-data provider is configured. Without one the
    /// dashboard runs on mock data.
    pub fn has_market_data_provider(&self) -> bool {
        self.market_data_api_key.is_some()
    }

    /// Rejects values that would make every request fail.
    pub fn validate(&self) -> Result<(), FundPilotError> {
        let base = &self.client.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(FundPilotError::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                ENV_API_BASE_URL, base
            )));
        }
        if self.client.timeout.is_zero() {
            return Err(FundPilotError::Config(format!(
                "{} must be greater than zero",
                ENV_API_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}

/// `~/.fundpilot/storage.json`, or `./.fundpilot/storage.json` without a home directory.
pub fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fundpilot")
        .join("storage.json")
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parsing_falls_back_on_garbage() {
        std::env::set_var("FUNDPILOT_TEST_GARBAGE_U64", "not-a-number");
        assert_eq!(env_u64("FUNDPILOT_TEST_GARBAGE_U64", 42), 42);
        std::env::set_var("FUNDPILOT_TEST_GOOD_U32", "7");
        assert_eq!(env_u32("FUNDPILOT_TEST_GOOD_U32", 3), 7);
    }

    #[test]
    fn blank_strings_are_unset() {
        std::env::set_var("FUNDPILOT_TEST_BLANK", "   ");
        assert_eq!(env_string("FUNDPILOT_TEST_BLANK"), None);
        assert_eq!(env_string("FUNDPILOT_TEST_NEVER_SET"), None);
    }

    #[test]
    fn validate_rejects_bad_base_url_and_zero_timeout() {
        let mut config = AppConfig {
            client: ClientConfig::default(),
            storage_path: default_storage_path(),
            market_data_api_key: None,
        };
        assert!(config.validate().is_ok());
        assert!(!config.has_market_data_provider());

        config.client.base_url = "localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(FundPilotError::Config(_))));

        config.client.base_url = "https://api.example.com".to_string();
        config.client.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(FundPilotError::Config(_))));
    }

    #[test]
    fn market_data_key_comes_from_env() {
        std::env::set_var(ENV_MARKET_DATA_API_KEY, " md-key ");
        let config = AppConfig::from_env();
        std::env::remove_var(ENV_MARKET_DATA_API_KEY);
        assert_eq!(config.market_data_api_key.as_deref(), Some("md-key"));
        assert!(config.has_market_data_provider());
    }

    #[test]
    fn default_storage_path_is_namespaced() {
        let path = default_storage_path();
        assert!(path.ends_with(".fundpilot/storage.json"));
    }
}
