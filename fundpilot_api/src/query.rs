//! Query parameter builders for the fund endpoints.

use chrono::NaiveDate;
use url::Url;

use crate::types::{DataInterval, FundType, IndicatorKind};

/// Implemented by all parameter builders. Appends the non-empty parameters to a URL.
pub trait Query {
    /// Key/value pairs to send. Unset optional parameters are omitted.
    fn pairs(&self) -> Vec<(&'static str, String)>;

    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        let pairs = self.pairs();
        if !pairs.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (key, value) in pairs.iter() {
                qp.append_pair(key, value);
            }
        }
        url
    }
}

/// Filters for `GET /funds`.
#[derive(Clone, Debug, Default)]
pub struct FundSearchParams {
    pub query: Option<String>,
    pub fund_type: Option<FundType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FundSearchParams {
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_fund_type(mut self, fund_type: FundType) -> Self {
        self.fund_type = Some(fund_type);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl Query for FundSearchParams {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(query) = &self.query {
            pairs.push(("query", query.clone()));
        }
        if let Some(fund_type) = self.fund_type {
            pairs.push(("type", fund_type.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// Parameters for `GET /funds/{code}/data`.
#[derive(Clone, Debug)]
pub struct FundDataParams {
    pub fund_code: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub interval: Option<DataInterval>,
}

impl FundDataParams {
    pub fn new(fund_code: &str) -> Self {
        Self {
            fund_code: fund_code.to_string(),
            start_date: None,
            end_date: None,
            interval: None,
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_interval(mut self, interval: DataInterval) -> Self {
        self.interval = Some(interval);
        self
    }
}

impl Query for FundDataParams {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = date_pairs(self.start_date, self.end_date);
        if let Some(interval) = self.interval {
            pairs.push(("interval", interval.to_string()));
        }
        pairs
    }
}

/// Parameters for `GET /funds/{code}/indicators`.
#[derive(Clone, Debug)]
pub struct TechnicalIndicatorParams {
    pub fund_code: String,
    pub indicators: Vec<IndicatorKind>,
    pub period: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TechnicalIndicatorParams {
    pub fn new(fund_code: &str, indicators: &[IndicatorKind]) -> Self {
        Self {
            fund_code: fund_code.to_string(),
            indicators: indicators.to_vec(),
            period: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_period(mut self, period: u32) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }
}

impl Query for TechnicalIndicatorParams {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(
            "indicators",
            self.indicators
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )];
        if let Some(period) = self.period {
            pairs.push(("period", period.to_string()));
        }
        pairs.extend(date_pairs(self.start_date, self.end_date));
        pairs
    }
}

/// Ad hoc key/value parameters.
impl Query for Vec<(&'static str, String)> {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        self.clone()
    }
}

fn date_pairs(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(start) = start {
        pairs.push(("start_date", start.format("%Y-%m-%d").to_string()));
    }
    if let Some(end) = end {
        pairs.push(("end_date", end.format("%Y-%m-%d").to_string()));
    }
    pairs
}
