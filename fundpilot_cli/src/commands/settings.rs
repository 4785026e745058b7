use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use fundpilot_lib::store::DataSync;
use fundpilot_lib::{Language, LanguageStore, SettingsStore, ThemeMode, ThemeStore};
use serde::Serialize;

use crate::commands::Context;
use crate::output::{print_json, OutputFormat};

/// Settings key under which `watch` looks for a market data provider key.
pub const MARKET_DATA_SERVICE: &str = "market-data";

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: Option<SettingsAction>,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current preferences (default)
    Show,
    /// Set the theme: light, dark, auto
    Theme { mode: String },
    /// Set the display language: zh-CN, en-US, ja-JP
    Language { code: String },
    /// Set where settings sync to: local, cloud
    DataSync { mode: String },
    /// Store an API key for a service (e.g. market-data, news)
    SetKey { service: String, key: String },
    /// Forget the API key for a service
    RemoveKey { service: String },
    /// Restore default settings. The watchlist is cleared too
    Reset,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    theme: ThemeMode,
    language: Language,
    data_sync: DataSync,
    watchlist: Vec<String>,
    api_keys: Vec<String>,
    notifications_enabled: bool,
    storage_path: String,
}

pub fn run(args: &SettingsArgs, ctx: &Context, format: &OutputFormat) -> Result<()> {
    let settings = SettingsStore::load(ctx.storage.clone());
    let theme = ThemeStore::load(ctx.storage.clone(), false);
    let language = LanguageStore::load(ctx.storage.clone());

    match args.action.as_ref().unwrap_or(&SettingsAction::Show) {
        SettingsAction::Show => {}
        SettingsAction::Theme { mode } => theme.set_theme(parse_theme(mode)?)?,
        SettingsAction::Language { code } => {
            language.set_language(code.parse().map_err(anyhow::Error::msg)?)?
        }
        SettingsAction::DataSync { mode } => settings.set_data_sync(parse_data_sync(mode)?)?,
        SettingsAction::SetKey { service, key } => settings.set_api_key(service, key)?,
        SettingsAction::RemoveKey { service } => settings.remove_api_key(service)?,
        SettingsAction::Reset => settings.reset()?,
    }

    let current = settings.settings();
    let view = SettingsView {
        theme: theme.state().mode,
        language: language.current(),
        data_sync: current.data_sync,
        watchlist: current.watchlist,
        // Only service names; keys are never echoed.
        api_keys: current.api_keys.into_keys().collect(),
        notifications_enabled: current.notifications.enabled,
        storage_path: ctx.config.storage_path.display().to_string(),
    };

    match format {
        OutputFormat::Json => print_json(&view),
        _ => print_view(&view),
    }
    Ok(())
}

fn print_view(view: &SettingsView) {
    println!("theme:         {:?}", view.theme);
    println!("language:      {} ({})", view.language.code(), view.language.native_name());
    println!("data sync:     {:?}", view.data_sync);
    println!("watchlist:     {}", view.watchlist.join(", "));
    println!("api keys:      {}", view.api_keys.join(", "));
    println!("notifications: {}", if view.notifications_enabled { "on" } else { "off" });
    println!("storage:       {}", view.storage_path);
}

fn parse_theme(input: &str) -> Result<ThemeMode> {
    match input.trim().to_lowercase().as_str() {
        "light" => Ok(ThemeMode::Light),
        "dark" => Ok(ThemeMode::Dark),
        "auto" => Ok(ThemeMode::Auto),
        other => Err(anyhow!("unknown theme '{}'. Valid: light, dark, auto", other)),
    }
}

fn parse_data_sync(input: &str) -> Result<DataSync> {
    match input.trim().to_lowercase().as_str() {
        "local" => Ok(DataSync::Local),
        "cloud" => Ok(DataSync::Cloud),
        other => Err(anyhow!("unknown sync mode '{}'. Valid: local, cloud", other)),
    }
}
