//! File-backed key-value storage for session and UI state.
//!
//! Entries live in a `DashMap` for concurrent reads and every mutation is
//! written through to a single JSON file. Values are opaque strings; typed
//! callers go through [`LocalStorage::get_json`] / [`LocalStorage::set_json`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use fundpilot_api::{TokenStore, TOKEN_KEY};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FundPilotError;

pub struct LocalStorage {
    store: DashMap<String, String>,
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    /// Held across a mutation and its flush so a failed write can be undone.
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Opens the storage file at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FundPilotError> {
        let path = path.as_ref().to_path_buf();
        let store = DashMap::new();
        match std::fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                let entries: BTreeMap<String, String> = serde_json::from_str(&contents)?;
                for (k, v) in entries {
                    store.insert(k, v);
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("Opened local storage at {}", path.display());
        Ok(Self {
            store,
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: DashMap::new(),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.store.get(key).map(|v| v.value().clone())
    }

    /// Stores `value` under `key`. If the file cannot be written the previous
    /// value is restored and the error returned.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), FundPilotError> {
        let _guard = self.lock_writes();
        let previous = self.store.insert(key.to_string(), value.to_string());
        self.flush_or_restore(key, previous)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), FundPilotError> {
        let _guard = self.lock_writes();
        let previous = self.store.remove(key).map(|(_, v)| v);
        self.flush_or_restore(key, previous)
    }

    pub fn clear(&self) -> Result<(), FundPilotError> {
        let _guard = self.lock_writes();
        let previous = self.snapshot();
        self.store.clear();
        if let Err(e) = self.flush() {
            for (k, v) in previous {
                self.store.insert(k, v);
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.store.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Reads and decodes a JSON value. A missing key is `Ok(None)`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, FundPilotError> {
        match self.get_item(key) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), FundPilotError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.store
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    fn flush_or_restore(&self, key: &str, previous: Option<String>) -> Result<(), FundPilotError> {
        let result = self.flush();
        if result.is_err() {
            match previous {
                Some(value) => {
                    self.store.insert(key.to_string(), value);
                }
                None => {
                    self.store.remove(key);
                }
            }
        }
        result
    }

    /// Writes the whole map to disk. Callers hold `write_lock`.
    fn flush(&self) -> Result<(), FundPilotError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self.snapshot();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&snapshot)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl TokenStore for LocalStorage {
    fn token(&self) -> Option<String> {
        self.get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) {
        if let Err(e) = self.set_item(TOKEN_KEY, token) {
            tracing::error!("Failed to persist session token: {}", e);
        }
    }

    fn clear_token(&self) {
        if let Err(e) = self.remove_item(TOKEN_KEY) {
            tracing::error!("Failed to clear session token: {}", e);
        }
    }
}
