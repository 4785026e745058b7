//! CLI subcommand implementations.

pub mod funds;
pub mod health;
pub mod session;
pub mod settings;
pub mod watch;
pub mod watchlist;

use std::sync::Arc;

use fundpilot_lib::fundpilot_api::SessionHandler;
use fundpilot_lib::{AppConfig, Client, LocalStorage};

/// Shared handles every subcommand receives.
pub struct Context {
    pub config: AppConfig,
    pub storage: Arc<LocalStorage>,
    pub client: Arc<Client>,
}

/// The terminal has no login page to route to, so a 401 becomes a hint.
pub struct CliSessionHandler;

impl SessionHandler for CliSessionHandler {
    fn on_unauthorized(&self, _login_route: &str) {
        eprintln!("Session expired or invalid. Run `fundpilot login --token <TOKEN>` to sign in again.");
    }
}
