//! Classifies how fresh the displayed data is and renders the indicator text.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::i18n::Language;
use crate::poller::RefreshState;

/// Data older than this is stale.
pub const DEFAULT_MAX_STALE: Duration = Duration::from_secs(10 * 60);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessStatus {
    Updating,
    MarketClosed,
    Stale,
    Fresh,
}

impl FreshnessStatus {
    pub fn label(&self, lang: Language) -> &'static str {
        match (self, lang) {
            (Self::Updating, Language::ZhCn) => "更新中...",
            (Self::MarketClosed, Language::ZhCn) => "休市中",
            (Self::Stale, Language::ZhCn) => "数据过期",
            (Self::Fresh, Language::ZhCn) => "数据正常",
            (Self::Updating, Language::EnUs) => "Updating...",
            (Self::MarketClosed, Language::EnUs) => "Market closed",
            (Self::Stale, Language::EnUs) => "Data stale",
            (Self::Fresh, Language::EnUs) => "Data current",
            (Self::Updating, Language::JaJp) => "更新中...",
            (Self::MarketClosed, Language::JaJp) => "休場中",
            (Self::Stale, Language::JaJp) => "データ期限切れ",
            (Self::Fresh, Language::JaJp) => "データ正常",
        }
    }

    pub fn description(&self, minutes: i64, lang: Language) -> String {
        match (self, lang) {
            (Self::Updating, Language::ZhCn) => "正在获取最新数据".to_string(),
            (Self::MarketClosed, Language::ZhCn) => "当前为非交易时间，数据暂停更新".to_string(),
            (Self::Stale, Language::ZhCn) => {
                format!("数据已过期 {} 分钟，请检查网络连接", minutes)
            }
            (Self::Fresh, Language::ZhCn) => format!("数据更新于 {} 分钟前", minutes),
            (Self::Updating, Language::EnUs) => "Fetching the latest data".to_string(),
            (Self::MarketClosed, Language::EnUs) => {
                "Outside trading hours, updates are paused".to_string()
            }
            (Self::Stale, Language::EnUs) => format!(
                "Data is {} minutes old, check your network connection",
                minutes
            ),
            (Self::Fresh, Language::EnUs) => format!("Data updated {} minutes ago", minutes),
            (Self::Updating, Language::JaJp) => "最新データを取得しています".to_string(),
            (Self::MarketClosed, Language::JaJp) => {
                "取引時間外のため更新を停止しています".to_string()
            }
            (Self::Stale, Language::JaJp) => format!(
                "データが {} 分間更新されていません。ネットワーク接続を確認してください",
                minutes
            ),
            (Self::Fresh, Language::JaJp) => format!("{} 分前に更新されました", minutes),
        }
    }
}

/// Whole minutes elapsed since `last_update`, floored, never negative.
pub fn minutes_since(last_update: DateTime<Local>, now: DateTime<Local>) -> i64 {
    (now - last_update).num_minutes().max(0)
}

/// Updating takes precedence over market closed, which takes precedence over staleness.
pub fn assess(state: &RefreshState, now: DateTime<Local>, max_stale: Duration) -> FreshnessStatus {
    if state.is_updating {
        return FreshnessStatus::Updating;
    }
    if !state.is_market_hours {
        return FreshnessStatus::MarketClosed;
    }
    let max_stale_minutes = (max_stale.as_secs() / 60) as i64;
    if minutes_since(state.last_update, now) > max_stale_minutes {
        FreshnessStatus::Stale
    } else {
        FreshnessStatus::Fresh
    }
}

pub fn format_relative(minutes: i64, lang: Language) -> String {
    if minutes < 1 {
        return match lang {
            Language::ZhCn => "刚刚".to_string(),
            Language::EnUs => "just now".to_string(),
            Language::JaJp => "たった今".to_string(),
        };
    }
    if minutes < 60 {
        return match lang {
            Language::ZhCn => format!("{} 分钟前", minutes),
            Language::EnUs => format!("{} min ago", minutes),
            Language::JaJp => format!("{} 分前", minutes),
        };
    }
    let hours = minutes / 60;
    let rem = minutes % 60;
    match (lang, rem) {
        (Language::ZhCn, 0) => format!("{} 小时前", hours),
        (Language::ZhCn, _) => format!("{} 小时 {} 分钟前", hours, rem),
        (Language::EnUs, 0) => format!("{} h ago", hours),
        (Language::EnUs, _) => format!("{} h {} min ago", hours, rem),
        (Language::JaJp, 0) => format!("{} 時間前", hours),
        (Language::JaJp, _) => format!("{} 時間 {} 分前", hours, rem),
    }
}

/// Everything the freshness indicator shows.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FreshnessReport {
    pub status: FreshnessStatus,
    pub label: String,
    pub description: String,
    pub relative: String,
    pub last_update: String,
    pub next_update: Option<String>,
}

impl FreshnessReport {
    pub fn build(
        state: &RefreshState,
        now: DateTime<Local>,
        max_stale: Duration,
        lang: Language,
    ) -> Self {
        let status = assess(state, now, max_stale);
        let minutes = minutes_since(state.last_update, now);
        Self {
            status,
            label: status.label(lang).to_string(),
            description: status.description(minutes, lang),
            relative: format_relative(minutes, lang),
            last_update: state.last_update.format("%H:%M:%S").to_string(),
            next_update: state
                .next_update
                .map(|t| t.format("%H:%M:%S").to_string()),
        }
    }

    /// One-line rendering: `数据正常 · 3 分钟前 · 下次更新 10:05:00`.
    pub fn summary_line(&self, lang: Language) -> String {
        let mut line = format!("{} · {}", self.label, self.relative);
        if let Some(next) = &self.next_update {
            let prefix = match lang {
                Language::ZhCn => "下次更新",
                Language::EnUs => "next update",
                Language::JaJp => "次回更新",
            };
            line.push_str(&format!(" · {} {}", prefix, next));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap()
    }

    fn state(is_updating: bool, is_market_hours: bool) -> RefreshState {
        RefreshState {
            last_update: base(),
            next_update: Some(base() + chrono::Duration::minutes(5)),
            is_updating,
            is_market_hours,
        }
    }

    #[test]
    fn minutes_floor() {
        let now = base() + chrono::Duration::seconds(179);
        assert_eq!(minutes_since(base(), now), 2);
        assert_eq!(minutes_since(now, base()), 0);
    }

    #[test]
    fn status_priority() {
        let late = base() + chrono::Duration::minutes(30);
        assert_eq!(
            assess(&state(true, false), late, DEFAULT_MAX_STALE),
            FreshnessStatus::Updating
        );
        assert_eq!(
            assess(&state(false, false), late, DEFAULT_MAX_STALE),
            FreshnessStatus::MarketClosed
        );
        assert_eq!(
            assess(&state(false, true), late, DEFAULT_MAX_STALE),
            FreshnessStatus::Stale
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let s = state(false, true);
        let at_threshold = base() + chrono::Duration::minutes(10);
        assert_eq!(assess(&s, at_threshold, DEFAULT_MAX_STALE), FreshnessStatus::Fresh);
        let past = base() + chrono::Duration::minutes(11);
        assert_eq!(assess(&s, past, DEFAULT_MAX_STALE), FreshnessStatus::Stale);
    }

    #[test]
    fn relative_text() {
        assert_eq!(format_relative(0, Language::ZhCn), "刚刚");
        assert_eq!(format_relative(5, Language::ZhCn), "5 分钟前");
        assert_eq!(format_relative(60, Language::ZhCn), "1 小时前");
        assert_eq!(format_relative(135, Language::ZhCn), "2 小时 15 分钟前");
        assert_eq!(format_relative(135, Language::EnUs), "2 h 15 min ago");
    }

    #[test]
    fn report_contents() {
        let now = base() + chrono::Duration::minutes(3);
        let report = FreshnessReport::build(&state(false, true), now, DEFAULT_MAX_STALE, Language::ZhCn);
        assert_eq!(report.status, FreshnessStatus::Fresh);
        assert_eq!(report.label, "数据正常");
        assert_eq!(report.description, "数据更新于 3 分钟前");
        assert_eq!(report.last_update, "10:00:00");
        assert_eq!(report.next_update.as_deref(), Some("10:05:00"));
        assert_eq!(
            report.summary_line(Language::ZhCn),
            "数据正常 · 3 分钟前 · 下次更新 10:05:00"
        );
    }

    #[test]
    fn stale_description_mentions_minutes() {
        let now = base() + chrono::Duration::minutes(42);
        let report = FreshnessReport::build(&state(false, true), now, DEFAULT_MAX_STALE, Language::ZhCn);
        assert_eq!(report.label, "数据过期");
        assert!(report.description.contains("42"));
    }
}
