//! Error types for the library layer.

use thiserror::Error;

/// Errors produced by the library layer, wrapping upstream API errors
/// and adding storage, serialization, and configuration failures.
#[derive(Error, Debug)]
pub enum FundPilotError {
    #[error("API error: {0}")]
    Api(#[from] fundpilot_api::ApiError),
    /// Reading or writing the local storage file failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A configuration value is missing or invalid.
    #[error("Config error: {0}")]
    Config(String),
    /// User-supplied input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
