//! Session token storage and the unauthorized-response hook.

use std::sync::RwLock;

/// Storage key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "fundpilot_token";

/// Source of the bearer token attached to outgoing requests.
///
/// Implementations must be cheap to read: the client reads the token once per attempt.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str);
    fn clear_token(&self);
}

/// Called after a 401 response, once the stored token has been cleared.
pub trait SessionHandler: Send + Sync {
    fn on_unauthorized(&self, login_route: &str);
}

/// Token store that lives only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_token(&self, token: &str) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Default handler: there is no navigation outside a browser, so the redirect is logged.
pub struct LogSessionHandler;

impl SessionHandler for LogSessionHandler {
    fn on_unauthorized(&self, login_route: &str) {
        tracing::warn!("Session expired, redirecting to {}", login_route);
    }
}
