//! Error types for the API client.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Classification of a failed call.
///
/// Serializes to the string form used by the backend and error displays:
/// `NETWORK_ERROR`, `UNKNOWN_ERROR`, or the HTTP status code (`"404"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No response was received (connect failure, timeout, dropped connection).
    Network,
    /// The server answered with a non-success status.
    Http(u16),
    /// Anything else, including undecodable payloads and malformed requests.
    Unknown,
}

impl ErrorCode {
    pub fn as_string(&self) -> String {
        match self {
            Self::Network => "NETWORK_ERROR".to_string(),
            Self::Http(status) => status.to_string(),
            Self::Unknown => "UNKNOWN_ERROR".to_string(),
        }
    }

    /// The HTTP status, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(status) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

/// A normalized API failure. Immutable once created.
#[derive(thiserror::Error, Debug, Clone, Serialize)]
#[error("{message} ({code})")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    timestamp: DateTime<Utc>,
}

pub(crate) const MSG_NETWORK: &str = "网络连接失败，请检查网络设置";
pub(crate) const MSG_FORBIDDEN: &str = "访问被拒绝，请检查权限";
pub(crate) const MSG_NOT_FOUND: &str = "请求的资源不存在";
pub(crate) const MSG_RATE_LIMITED: &str = "请求过于频繁，请稍后再试";
pub(crate) const MSG_SERVER: &str = "服务器内部错误，请稍后再试";
pub(crate) const MSG_REQUEST_FAILED: &str = "请求失败";
pub(crate) const MSG_UNKNOWN: &str = "未知错误";

impl ApiError {
    fn new(code: ErrorCode, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message,
            details,
            timestamp: Utc::now(),
        }
    }

    /// No response was received.
    pub fn network(details: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Network,
            MSG_NETWORK.to_string(),
            Some(serde_json::Value::String(details.into())),
        )
    }

    /// An unexpected failure outside the HTTP exchange itself.
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            MSG_UNKNOWN.to_string()
        } else {
            message
        };
        Self::new(ErrorCode::Unknown, message, None)
    }

    /// Builds the error for a non-success response. `body` is the parsed
    /// response payload, if it was JSON.
    pub fn from_status(status: u16, body: Option<serde_json::Value>) -> Self {
        let server_message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let message = match status {
            403 => MSG_FORBIDDEN.to_string(),
            404 => MSG_NOT_FOUND.to_string(),
            429 => MSG_RATE_LIMITED.to_string(),
            500 => MSG_SERVER.to_string(),
            _ => server_message.unwrap_or_else(|| MSG_REQUEST_FAILED.to_string()),
        };
        Self::new(ErrorCode::Http(status), message, body)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the failure is transient: no response, rate limiting, or a
    /// server-side error. Other client errors are definite and never retried.
    pub fn is_retryable(&self) -> bool {
        match self.code {
            ErrorCode::Network => true,
            ErrorCode::Http(status) => status == 429 || status >= 500,
            ErrorCode::Unknown => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::unknown(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}
