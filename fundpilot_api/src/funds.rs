//! Typed wrappers over the `/funds` endpoints.

use reqwest::Method;
use serde::Serialize;

use crate::{
    client::{Client, Request, RequestOptions},
    query::{FundDataParams, FundSearchParams, TechnicalIndicatorParams},
    types::{Fund, FundDataPoint, PerformanceMetrics, TechnicalIndicator},
    ApiError,
};

/// Default result count for [`FundsApi::search`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Default look-back window for [`FundsApi::performance_metrics`].
pub const DEFAULT_METRICS_PERIOD: &str = "1y";

#[derive(Serialize)]
struct WatchlistAdd<'a> {
    fund_code: &'a str,
}

/// Borrowed view over a [`Client`] exposing the fund endpoints.
pub struct FundsApi<'a> {
    client: &'a Client,
}

impl<'a> FundsApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Lists funds matching the given filters.
    pub async fn list(&self, params: &FundSearchParams) -> Result<Vec<Fund>, ApiError> {
        self.client
            .send(Request::new(Method::GET, "/funds").with_query(params))
            .await
    }

    /// Free-text search by code or name.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Fund>, ApiError> {
        let params = vec![("query", query.to_string()), ("limit", limit.to_string())];
        self.client
            .send(Request::new(Method::GET, "/funds/search").with_query(&params))
            .await
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Fund, ApiError> {
        self.client
            .get(&format!("/funds/{}", code), RequestOptions::default())
            .await
    }

    pub async fn historical_data(
        &self,
        params: &FundDataParams,
    ) -> Result<Vec<FundDataPoint>, ApiError> {
        let path = format!("/funds/{}/data", params.fund_code);
        self.client
            .send(Request::new(Method::GET, &path).with_query(params))
            .await
    }

    pub async fn technical_indicators(
        &self,
        params: &TechnicalIndicatorParams,
    ) -> Result<Vec<TechnicalIndicator>, ApiError> {
        let path = format!("/funds/{}/indicators", params.fund_code);
        self.client
            .send(Request::new(Method::GET, &path).with_query(params))
            .await
    }

    /// Return, volatility and risk ratios over `period` (e.g. `1y`, `6m`).
    pub async fn performance_metrics(
        &self,
        code: &str,
        period: &str,
    ) -> Result<PerformanceMetrics, ApiError> {
        let path = format!("/funds/{}/metrics", code);
        let params = vec![("period", period.to_string())];
        self.client
            .send(Request::new(Method::GET, &path).with_query(&params))
            .await
    }

    pub async fn add_to_watchlist(&self, code: &str) -> Result<(), ApiError> {
        self.client
            .post::<serde_json::Value, _>(
                "/funds/watchlist",
                &WatchlistAdd { fund_code: code },
                RequestOptions::default(),
            )
            .await
            .map(|_| ())
    }

    pub async fn remove_from_watchlist(&self, code: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(
                &format!("/funds/watchlist/{}", code),
                RequestOptions::default(),
            )
            .await
            .map(|_| ())
    }

    pub async fn watchlist(&self) -> Result<Vec<Fund>, ApiError> {
        self.client
            .get("/funds/watchlist", RequestOptions::default())
            .await
    }
}
