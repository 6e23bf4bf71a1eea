//! Market data trait definition.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;

/// Source of recent bars for the traded instrument.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch up to `limit` most recent bars, ordered oldest to newest.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError>;

    /// Latest traded price.
    async fn latest_price(&self, symbol: &str) -> Result<f64, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
