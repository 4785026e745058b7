//! Pluggable market data sources.
//!
//! The dashboard reads funds and indices through [`MarketDataSource`].
//! [`ApiDataSource`] talks to the backend; [`MockDataSource`] generates
//! randomized in-memory data and is used when no provider is configured.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use fundpilot_api::types::{Fund, FundDataPoint, FundType, MarketIndex, Trend};
use fundpilot_api::{Client, FundDataParams, RequestOptions};
use rand::Rng;

use crate::error::FundPilotError;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current valuations for `codes`. An empty slice means the remote watchlist
    /// for API sources and the full catalog for mock sources.
    async fn funds(&self, codes: &[String]) -> Result<Vec<Fund>, FundPilotError>;

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, FundPilotError>;

    /// Daily series covering the last `days` days, oldest first.
    async fn history(&self, code: &str, days: u32) -> Result<Vec<FundDataPoint>, FundPilotError>;
}

/// Backend-backed source.
pub struct ApiDataSource {
    client: Arc<Client>,
}

impl ApiDataSource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketDataSource for ApiDataSource {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn funds(&self, codes: &[String]) -> Result<Vec<Fund>, FundPilotError> {
        if codes.is_empty() {
            return Ok(self.client.funds().watchlist().await?);
        }
        let mut funds = Vec::with_capacity(codes.len());
        for code in codes {
            funds.push(self.client.funds().get_by_code(code).await?);
        }
        Ok(funds)
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, FundPilotError> {
        Ok(self
            .client
            .get("/market/indices", RequestOptions::default())
            .await?)
    }

    async fn history(&self, code: &str, days: u32) -> Result<Vec<FundDataPoint>, FundPilotError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days));
        let params = FundDataParams::new(code).with_range(start, end);
        Ok(self.client.funds().historical_data(&params).await?)
    }
}

struct MockFund {
    code: &'static str,
    name: &'static str,
    fund_type: FundType,
    value: f64,
}

const MOCK_FUNDS: &[MockFund] = &[
    MockFund {
        code: "001938",
        name: "易方达消费精选",
        fund_type: FundType::Mixed,
        value: 2.1234,
    },
    MockFund {
        code: "320007",
        name: "华夏科技成长",
        fund_type: FundType::Stock,
        value: 1.8765,
    },
    MockFund {
        code: "161725",
        name: "招商中证白酒",
        fund_type: FundType::Index,
        value: 0.9876,
    },
    MockFund {
        code: "110017",
        name: "易方达增强回报债券",
        fund_type: FundType::Bond,
        value: 1.4521,
    },
];

const MOCK_INDICES: &[(&str, &str, f64)] = &[
    ("沪深300", "CSI300", 3456.78),
    ("创业板", "SZSE", 2234.56),
    ("恒生指数", "HSI", 18234.56),
    ("纳斯达克", "NASDAQ", 14567.89),
];

/// Randomized in-memory data around fixed base values.
#[derive(Default)]
pub struct MockDataSource;

impl MockDataSource {
    pub fn new() -> Self {
        Self
    }

    fn mock_fund(base: &MockFund) -> Fund {
        let mut rng = rand::thread_rng();
        let daily_change_percent = (rng.gen::<f64>() - 0.5) * 3.0;
        let current_value = base.value * (1.0 + daily_change_percent / 100.0);
        Fund {
            code: base.code.to_string(),
            name: base.name.to_string(),
            fund_type: base.fund_type,
            current_value,
            daily_change: current_value - base.value,
            daily_change_percent,
            last_update: Utc::now(),
        }
    }

    fn unknown_fund(code: &str) -> Fund {
        let base = MockFund {
            code: "",
            name: "",
            fund_type: FundType::Mixed,
            value: 1.0 + rand::thread_rng().gen::<f64>() * 2.0,
        };
        Fund {
            code: code.to_string(),
            name: format!("基金 {}", code),
            ..Self::mock_fund(&base)
        }
    }
}

#[async_trait]
impl MarketDataSource for MockDataSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn funds(&self, codes: &[String]) -> Result<Vec<Fund>, FundPilotError> {
        if codes.is_empty() {
            return Ok(MOCK_FUNDS.iter().map(Self::mock_fund).collect());
        }
        Ok(codes
            .iter()
            .map(|code| match MOCK_FUNDS.iter().find(|f| f.code == code.as_str()) {
                Some(base) => Self::mock_fund(base),
                None => Self::unknown_fund(code),
            })
            .collect())
    }

    async fn market_indices(&self) -> Result<Vec<MarketIndex>, FundPilotError> {
        let mut rng = rand::thread_rng();
        Ok(MOCK_INDICES
            .iter()
            .map(|(name, code, value)| {
                let change = (rng.gen::<f64>() - 0.5) * 50.0;
                MarketIndex {
                    name: name.to_string(),
                    code: code.to_string(),
                    value: value + (rng.gen::<f64>() - 0.5) * 10.0,
                    change,
                    change_percent: change / value * 100.0,
                    trend: Trend::from_change(change),
                }
            })
            .collect())
    }

    async fn history(&self, _code: &str, days: u32) -> Result<Vec<FundDataPoint>, FundPilotError> {
        let mut rng = rand::thread_rng();
        let base_value = rng.gen::<f64>() * 2.0 + 1.0;
        let today = Utc::now();
        Ok((0..=days)
            .rev()
            .map(|i| {
                let noise = (rng.gen::<f64>() - 0.5) * 0.1;
                let value = base_value + (f64::from(i) * 0.1).sin() * 0.2 + noise;
                FundDataPoint {
                    date: today - Duration::days(i64::from(i)),
                    value: value.max(0.1),
                    volume: Some(rng.gen_range(0..1_000_000) as f64),
                }
            })
            .collect())
    }
}
