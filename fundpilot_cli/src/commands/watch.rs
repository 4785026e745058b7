use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::Args;
use fundpilot_lib::freshness::DEFAULT_MAX_STALE;
use fundpilot_lib::poller::DEFAULT_INTERVAL;
use fundpilot_lib::types::{Fund, MarketIndex};
use fundpilot_lib::validation;
use fundpilot_lib::{
    ApiDataSource, DashboardRefresher, FreshnessReport, FundStore, Language, LanguageStore,
    MarketDataSource, MockDataSource, Poller, PollerConfig, RefreshOutcome, RefreshState,
    SettingsStore,
};
use serde::Serialize;

use crate::commands::settings::MARKET_DATA_SERVICE;
use crate::commands::Context;
use crate::output::{print_funds, print_indices, print_json, OutputFormat};

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between refreshes
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_secs())]
    pub interval_secs: u64,

    /// Refresh around the clock instead of only during market hours
    #[arg(long)]
    pub ignore_market_hours: bool,

    /// Use generated data instead of the backend
    #[arg(long)]
    pub mock: bool,

    /// Minutes after which data is reported as stale
    #[arg(long, default_value_t = DEFAULT_MAX_STALE.as_secs() / 60)]
    pub max_stale_mins: u64,

    /// Refresh once, print, and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    funds: &'a [Fund],
    indices: &'a [MarketIndex],
    freshness: &'a FreshnessReport,
}

pub async fn run(args: &WatchArgs, ctx: &Context, format: &OutputFormat) -> Result<()> {
    let interval = validation::validate_interval_secs(args.interval_secs)?;
    let max_stale = Duration::from_secs(args.max_stale_mins.saturating_mul(60));
    let lang = LanguageStore::load(ctx.storage.clone()).current();

    let settings = Arc::new(SettingsStore::load(ctx.storage.clone()));
    let funds = Arc::new(FundStore::load(ctx.storage.clone()));
    let source = select_source(args, ctx, &settings);
    eprintln!("Watching with {} data source", source.name());

    let refresher = Arc::new(DashboardRefresher::new(source, funds.clone(), settings.clone()));
    let indices = refresher.indices();
    let poller = Poller::new(
        PollerConfig {
            interval,
            enabled: true,
            market_hours_only: !args.ignore_market_hours,
            ..PollerConfig::default()
        },
        refresher,
    );

    let render = |state: &RefreshState| -> Result<()> {
        let visible = visible_funds(&funds, &settings);
        let current_indices = indices.borrow().clone();
        let report = FreshnessReport::build(state, Local::now(), max_stale, lang);
        match format {
            OutputFormat::Json => print_json(&Snapshot {
                funds: &visible,
                indices: &current_indices,
                freshness: &report,
            }),
            _ => {
                print_indices(&current_indices, format)?;
                print_funds(&visible, format)?;
                println!("{}", report.summary_line(lang));
            }
        }
        Ok(())
    };

    if args.once {
        if poller.refresh().await == RefreshOutcome::Failed {
            anyhow::bail!("refresh failed; see log for details");
        }
        return render(&poller.state());
    }

    if !poller.is_market_hours() {
        eprintln!("{}", closed_notice(lang));
    }

    let mut rx = poller.subscribe();
    poller.start();
    let mut rendered_at = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.is_updating {
                    continue;
                }
                if rendered_at != Some(state.last_update) {
                    rendered_at = Some(state.last_update);
                    render(&state)?;
                } else {
                    let report = FreshnessReport::build(&state, Local::now(), max_stale, lang);
                    eprintln!("{}", report.summary_line(lang));
                }
            }
        }
    }

    poller.stop();
    eprintln!("Stopped");
    Ok(())
}

fn select_source(
    args: &WatchArgs,
    ctx: &Context,
    settings: &SettingsStore,
) -> Arc<dyn MarketDataSource> {
    let has_provider = ctx.config.has_market_data_provider()
        || settings
            .settings()
            .api_keys
            .contains_key(MARKET_DATA_SERVICE);
    if args.mock || !has_provider {
        Arc::new(MockDataSource::new())
    } else {
        Arc::new(ApiDataSource::new(ctx.client.clone()))
    }
}

/// Watchlist funds in watchlist order, or every cached fund when the watchlist is empty.
fn visible_funds(funds: &FundStore, settings: &SettingsStore) -> Vec<Fund> {
    let watchlist = settings.settings().watchlist;
    if watchlist.is_empty() {
        return funds.state().funds;
    }
    watchlist
        .iter()
        .filter_map(|code| funds.fund_by_code(code))
        .collect()
}

fn closed_notice(lang: Language) -> &'static str {
    match lang {
        Language::ZhCn => "当前休市，将在交易时间 (周一至周五 09:00-15:00) 自动刷新",
        Language::EnUs => "Market closed; refreshing resumes during trading hours (Mon-Fri 09:00-15:00)",
        Language::JaJp => "市場は閉まっています。取引時間 (月〜金 09:00-15:00) に自動更新します",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fundpilot_lib::types::FundType;
    use fundpilot_lib::LocalStorage;

    fn fund(code: &str) -> Fund {
        Fund {
            code: code.to_string(),
            name: format!("Fund {}", code),
            fund_type: FundType::Mixed,
            current_value: 1.5,
            daily_change: 0.01,
            daily_change_percent: 0.67,
            last_update: chrono::Utc.with_ymd_and_hms(2024, 6, 12, 7, 0, 0).unwrap(),
        }
    }

    #[test]
    fn visible_funds_follow_watchlist_order() {
        let storage = Arc::new(LocalStorage::in_memory());
        let funds = FundStore::load(storage.clone());
        let settings = SettingsStore::load(storage);
        funds
            .set_funds(vec![fund("001938"), fund("320007"), fund("161725")])
            .unwrap();
        settings
            .set_watchlist(vec!["161725".to_string(), "999999".to_string(), "001938".to_string()])
            .unwrap();

        let codes: Vec<String> = visible_funds(&funds, &settings)
            .into_iter()
            .map(|f| f.code)
            .collect();
        assert_eq!(codes, vec!["161725", "001938"]);
    }

    #[test]
    fn visible_funds_without_watchlist_shows_cache() {
        let storage = Arc::new(LocalStorage::in_memory());
        let funds = FundStore::load(storage.clone());
        let settings = SettingsStore::load(storage);
        funds.set_funds(vec![fund("001938"), fund("320007")]).unwrap();
        assert_eq!(visible_funds(&funds, &settings).len(), 2);
    }
}
