//! The refresh callback that keeps dashboard state current.

use std::sync::Arc;

use async_trait::async_trait;
use fundpilot_api::types::MarketIndex;
use tokio::sync::watch;

use crate::poller::{BoxError, Refresher};
use crate::source::MarketDataSource;
use crate::store::{FundStore, SettingsStore};

/// Pulls watchlist funds and market indices from a data source into the stores.
///
/// On failure nothing is overwritten, so the last good data stays on screen.
pub struct DashboardRefresher {
    source: Arc<dyn MarketDataSource>,
    funds: Arc<FundStore>,
    settings: Arc<SettingsStore>,
    indices: watch::Sender<Vec<MarketIndex>>,
}

impl DashboardRefresher {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        funds: Arc<FundStore>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let (indices, _) = watch::channel(Vec::new());
        Self {
            source,
            funds,
            settings,
            indices,
        }
    }

    pub fn indices(&self) -> watch::Receiver<Vec<MarketIndex>> {
        self.indices.subscribe()
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

#[async_trait]
impl Refresher for DashboardRefresher {
    async fn refresh(&self) -> Result<(), BoxError> {
        let codes = self.settings.settings().watchlist;
        let funds = self.source.funds(&codes).await?;
        let indices = self.source.market_indices().await?;

        tracing::debug!(
            "Refreshed {} funds and {} indices from {}",
            funds.len(),
            indices.len(),
            self.source.name()
        );
        for fund in funds {
            self.funds.add_fund(fund)?;
        }
        self.indices.send_replace(indices);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FundPilotError;
    use crate::source::MockDataSource;
    use crate::storage::LocalStorage;
    use fundpilot_api::types::{Fund, FundDataPoint};

    struct FailingSource;

    #[async_trait]
    impl MarketDataSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn funds(&self, _codes: &[String]) -> Result<Vec<Fund>, FundPilotError> {
            Err(fundpilot_api::ApiError::network("connection reset").into())
        }

        async fn market_indices(&self) -> Result<Vec<MarketIndex>, FundPilotError> {
            Ok(Vec::new())
        }

        async fn history(
            &self,
            _code: &str,
            _days: u32,
        ) -> Result<Vec<FundDataPoint>, FundPilotError> {
            Ok(Vec::new())
        }
    }

    fn stores() -> (Arc<FundStore>, Arc<SettingsStore>) {
        let storage = Arc::new(LocalStorage::in_memory());
        (
            Arc::new(FundStore::load(Arc::clone(&storage))),
            Arc::new(SettingsStore::load(storage)),
        )
    }

    #[tokio::test]
    async fn refresh_fills_stores_for_watchlist() {
        let (funds, settings) = stores();
        settings.add_to_watchlist("320007").unwrap();
        let refresher =
            DashboardRefresher::new(Arc::new(MockDataSource::new()), funds.clone(), settings);
        let indices = refresher.indices();

        refresher.refresh().await.unwrap();
        assert_eq!(funds.state().funds.len(), 1);
        assert_eq!(funds.fund_by_code("320007").unwrap().name, "华夏科技成长");
        assert_eq!(indices.borrow().len(), 4);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_data() {
        let (funds, settings) = stores();
        let good = DashboardRefresher::new(
            Arc::new(MockDataSource::new()),
            funds.clone(),
            settings.clone(),
        );
        good.refresh().await.unwrap();
        let before = funds.state();

        let bad = DashboardRefresher::new(Arc::new(FailingSource), funds.clone(), settings);
        assert!(bad.refresh().await.is_err());
        assert_eq!(funds.state(), before);
    }
}
