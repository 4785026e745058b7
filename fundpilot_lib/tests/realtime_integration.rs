//! Poller driving the dashboard refresh against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use fundpilot_lib::freshness::DEFAULT_MAX_STALE;
use fundpilot_lib::{
    ApiDataSource, Client, ClientConfig, DashboardRefresher, FreshnessReport, FreshnessStatus,
    FundStore, Language, LocalStorage, Poller, PollerConfig, RefreshOutcome, SettingsStore,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fund_json(code: &str, value: f64) -> serde_json::Value {
    serde_json::json!({
        "code": code,
        "name": format!("基金 {}", code),
        "type": "index",
        "currentValue": value,
        "dailyChange": 0.01,
        "dailyChangePercent": 0.5,
        "lastUpdate": "2024-06-12T07:00:00Z"
    })
}

fn indices_json() -> serde_json::Value {
    serde_json::json!([{
        "name": "沪深300",
        "code": "CSI300",
        "value": 3456.78,
        "change": 12.5,
        "changePercent": 0.36,
        "trend": "up"
    }])
}

fn fast_client(server: &MockServer) -> Arc<Client> {
    let config = ClientConfig {
        base_url: server.uri(),
        max_retries: 1,
        retry_base_delay: Duration::from_millis(5),
        ..ClientConfig::default()
    };
    Arc::new(Client::new(config).unwrap())
}

struct Dashboard {
    funds: Arc<FundStore>,
    refresher: Arc<DashboardRefresher>,
}

fn dashboard(client: Arc<Client>, watchlist: &[&str]) -> Dashboard {
    let storage = Arc::new(LocalStorage::in_memory());
    let funds = Arc::new(FundStore::load(storage.clone()));
    let settings = Arc::new(SettingsStore::load(storage));
    settings
        .set_watchlist(watchlist.iter().map(|c| c.to_string()).collect())
        .unwrap();
    let refresher = Arc::new(DashboardRefresher::new(
        Arc::new(ApiDataSource::new(client)),
        funds.clone(),
        settings,
    ));
    Dashboard { funds, refresher }
}

fn always_open() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_secs(60),
        market_hours_only: false,
        ..PollerConfig::default()
    }
}

#[tokio::test]
async fn started_poller_fetches_watchlist_into_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/funds/161725"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fund_json("161725", 0.9876)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market/indices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indices_json()))
        .mount(&server)
        .await;

    let dash = dashboard(fast_client(&server), &["161725"]);
    let indices = dash.refresher.indices();
    let poller = Poller::new(always_open(), dash.refresher.clone());
    let mut rx = poller.subscribe();
    poller.start();

    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if !state.is_updating && dash.funds.fund_by_code("161725").is_some() {
                return state;
            }
        }
    })
    .await
    .expect("refresh did not complete");

    assert!(state.next_update.is_some());
    assert_eq!(indices.borrow().len(), 1);

    let report = FreshnessReport::build(&state, Local::now(), DEFAULT_MAX_STALE, Language::ZhCn);
    assert_eq!(report.status, FreshnessStatus::Fresh);
    assert_eq!(report.label, "数据正常");

    poller.stop();
    assert_eq!(poller.state().next_update, None);
}

#[tokio::test]
async fn backend_failure_keeps_cached_funds_and_clears_updating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/funds/161725"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dash = dashboard(fast_client(&server), &["161725"]);
    let poller = Poller::new(always_open(), dash.refresher.clone());

    let outcome = poller.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Failed);
    assert!(!poller.state().is_updating);
    assert!(dash.funds.state().funds.is_empty());
}

#[tokio::test]
async fn manual_refresh_while_stopped_leaves_next_update_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/funds/watchlist"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([fund_json("001938", 2.1234)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market/indices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indices_json()))
        .mount(&server)
        .await;

    let dash = dashboard(fast_client(&server), &[]);
    let poller = Poller::new(always_open(), dash.refresher.clone());

    assert_eq!(poller.refresh().await, RefreshOutcome::Completed);
    let state = poller.state();
    assert_eq!(state.next_update, None);
    assert!(!state.is_updating);
    assert_eq!(dash.funds.state().funds.len(), 1);
}
