//! Persisted UI state: selected funds, theme, language and user settings.
//!
//! Each slice lives under its own storage key and is only changed through the
//! store's mutation methods. A change is written to storage first, then
//! published to subscribers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use fundpilot_api::types::Fund;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::FundPilotError;
use crate::i18n::Language;
use crate::storage::LocalStorage;

pub const FUNDS_KEY: &str = "fundpilot-funds";
pub const THEME_KEY: &str = "fundpilot-theme";
pub const LANGUAGE_KEY: &str = "fundpilot-language";
pub const SETTINGS_KEY: &str = "fundpilot-settings";

/// A state slice bound to one storage key.
pub struct PersistedStore<S> {
    key: &'static str,
    storage: Arc<LocalStorage>,
    state: watch::Sender<S>,
    /// Held from read to publish so concurrent mutations never drop each other.
    update_lock: Mutex<()>,
}

impl<S> PersistedStore<S>
where
    S: Serialize + DeserializeOwned + Default + Clone,
{
    /// Rehydrates the slice. An unreadable entry is logged and replaced by the default.
    pub fn load(storage: Arc<LocalStorage>, key: &'static str) -> Self {
        let initial = match storage.get_json::<S>(key) {
            Ok(Some(state)) => state,
            Ok(None) => S::default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable {} state: {}", key, e);
                S::default()
            }
        };
        let (state, _) = watch::channel(initial);
        Self {
            key,
            storage,
            state,
            update_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    fn update(&self, f: impl FnOnce(&mut S)) -> Result<(), FundPilotError> {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = self.get();
        f(&mut next);
        self.storage.set_json(self.key, &next)?;
        self.state.send_replace(next);
        Ok(())
    }
}

// -- Funds --

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FundState {
    pub funds: Vec<Fund>,
    pub selected_funds: Vec<String>,
}

pub struct FundStore {
    inner: PersistedStore<FundState>,
}

impl FundStore {
    pub fn load(storage: Arc<LocalStorage>) -> Self {
        Self {
            inner: PersistedStore::load(storage, FUNDS_KEY),
        }
    }

    pub fn state(&self) -> FundState {
        self.inner.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<FundState> {
        self.inner.subscribe()
    }

    pub fn set_funds(&self, funds: Vec<Fund>) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.funds = funds)
    }

    /// Inserts the fund, replacing any record with the same code.
    pub fn add_fund(&self, fund: Fund) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            s.funds.retain(|f| f.code != fund.code);
            s.funds.push(fund);
        })
    }

    /// Removes the fund and drops it from the selection.
    pub fn remove_fund(&self, code: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            s.funds.retain(|f| f.code != code);
            s.selected_funds.retain(|c| c != code);
        })
    }

    pub fn set_selected(&self, codes: Vec<String>) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.selected_funds = codes)
    }

    pub fn select(&self, code: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            if !s.selected_funds.iter().any(|c| c == code) {
                s.selected_funds.push(code.to_string());
            }
        })
    }

    pub fn unselect(&self, code: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.selected_funds.retain(|c| c != code))
    }

    /// Known records for the selected codes, in fund-list order.
    pub fn selected_funds(&self) -> Vec<Fund> {
        let state = self.inner.get();
        state
            .funds
            .into_iter()
            .filter(|f| state.selected_funds.contains(&f.code))
            .collect()
    }

    pub fn fund_by_code(&self, code: &str) -> Option<Fund> {
        self.inner.get().funds.into_iter().find(|f| f.code == code)
    }
}

// -- Theme --

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeState {
    pub mode: ThemeMode,
    pub is_dark: bool,
}

pub struct ThemeStore {
    inner: PersistedStore<ThemeState>,
    system_dark: bool,
}

impl ThemeStore {
    /// `system_dark` is the platform preference used while the mode is `Auto`.
    pub fn load(storage: Arc<LocalStorage>, system_dark: bool) -> Self {
        let store = Self {
            inner: PersistedStore::load(storage, THEME_KEY),
            system_dark,
        };
        if store.inner.get().mode == ThemeMode::Auto {
            store.inner.state.send_modify(|s| s.is_dark = system_dark);
        }
        store
    }

    pub fn state(&self) -> ThemeState {
        self.inner.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.inner.subscribe()
    }

    pub fn set_theme(&self, mode: ThemeMode) -> Result<(), FundPilotError> {
        let is_dark = match mode {
            ThemeMode::Auto => self.system_dark,
            ThemeMode::Dark => true,
            ThemeMode::Light => false,
        };
        self.inner.update(|s| {
            s.mode = mode;
            s.is_dark = is_dark;
        })
    }

    /// Flips between explicit light and dark, leaving `Auto`.
    pub fn toggle(&self) -> Result<(), FundPilotError> {
        let mode = if self.inner.get().is_dark {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        };
        self.set_theme(mode)
    }
}

// -- Language --

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageState {
    pub current_language: Language,
}

pub struct LanguageStore {
    inner: PersistedStore<LanguageState>,
}

impl LanguageStore {
    pub fn load(storage: Arc<LocalStorage>) -> Self {
        Self {
            inner: PersistedStore::load(storage, LANGUAGE_KEY),
        }
    }

    pub fn current(&self) -> Language {
        self.inner.get().current_language
    }

    pub fn subscribe(&self) -> watch::Receiver<LanguageState> {
        self.inner.subscribe()
    }

    pub fn set_language(&self, language: Language) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.current_language = language)
    }
}

// -- Settings --

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    ServerChan,
    Email,
    Telegram,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFrequency {
    #[default]
    Daily,
    Weekly,
    Realtime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub channels: Vec<NotificationChannel>,
    pub frequency: NotificationFrequency,
    /// Cron expression for scheduled digests.
    pub schedule: String,
    pub credentials: BTreeMap<String, String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channels: Vec::new(),
            frequency: NotificationFrequency::Daily,
            schedule: "0 18 * * *".to_string(),
            credentials: BTreeMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSync {
    #[default]
    Local,
    Cloud,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Fund codes, in insertion order, without duplicates.
    pub watchlist: Vec<String>,
    pub notifications: NotificationConfig,
    pub api_keys: BTreeMap<String, String>,
    pub data_sync: DataSync,
}

pub struct SettingsStore {
    inner: PersistedStore<UserSettings>,
}

impl SettingsStore {
    pub fn load(storage: Arc<LocalStorage>) -> Self {
        Self {
            inner: PersistedStore::load(storage, SETTINGS_KEY),
        }
    }

    pub fn settings(&self) -> UserSettings {
        self.inner.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserSettings> {
        self.inner.subscribe()
    }

    pub fn add_to_watchlist(&self, code: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            if !s.watchlist.iter().any(|c| c == code) {
                s.watchlist.push(code.to_string());
            }
        })
    }

    pub fn remove_from_watchlist(&self, code: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.watchlist.retain(|c| c != code))
    }

    pub fn set_watchlist(&self, codes: Vec<String>) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            s.watchlist.clear();
            for code in codes {
                if !s.watchlist.contains(&code) {
                    s.watchlist.push(code);
                }
            }
        })
    }

    pub fn set_api_key(&self, service: &str, key: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            s.api_keys.insert(service.to_string(), key.to_string());
        })
    }

    pub fn remove_api_key(&self, service: &str) -> Result<(), FundPilotError> {
        self.inner.update(|s| {
            s.api_keys.remove(service);
        })
    }

    pub fn set_data_sync(&self, mode: DataSync) -> Result<(), FundPilotError> {
        self.inner.update(|s| s.data_sync = mode)
    }

    pub fn update_notifications(
        &self,
        f: impl FnOnce(&mut NotificationConfig),
    ) -> Result<(), FundPilotError> {
        self.inner.update(|s| f(&mut s.notifications))
    }

    pub fn reset(&self) -> Result<(), FundPilotError> {
        self.inner.update(|s| *s = UserSettings::default())
    }
}
