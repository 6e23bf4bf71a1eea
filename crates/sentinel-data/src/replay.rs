//! Bar replay as live market data.

use async_trait::async_trait;
use sentinel_core::error::DataError;
use sentinel_core::traits::MarketData;
use sentinel_core::types::{Bar, Timeframe};
use std::sync::Mutex;

/// Replays a recorded series one bar per fetch, as if the bars were arriving
/// live. Each `fetch_bars` call reveals the next bar; once every bar has been
/// revealed the feed reports [`DataError::NoDataAvailable`].
pub struct ReplayFeed {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    /// Number of bars visible to the next fetch
    cursor: Mutex<usize>,
}

impl ReplayFeed {
    /// `warm_up` bars are visible from the first fetch.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>, warm_up: usize) -> Self {
        let start = warm_up.clamp(1, bars.len().max(1));
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            cursor: Mutex::new(start),
        }
    }

    pub fn remaining(&self) -> usize {
        let cursor = *self.cursor.lock().unwrap();
        (self.bars.len() + 1).saturating_sub(cursor)
    }

    fn check(&self, symbol: &str) -> Result<(), DataError> {
        if symbol != self.symbol {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketData for ReplayFeed {
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, DataError> {
        self.check(symbol)?;
        if timeframe != self.timeframe {
            return Err(DataError::NoDataAvailable);
        }

        let mut cursor = self.cursor.lock().unwrap();
        if *cursor > self.bars.len() || self.bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        let end = *cursor;
        *cursor += 1;
        Ok(self.bars[end.saturating_sub(limit)..end].to_vec())
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, DataError> {
        self.check(symbol)?;
        let cursor = *self.cursor.lock().unwrap();
        let visible = cursor.saturating_sub(1).min(self.bars.len());
        self.bars[..visible]
            .last()
            .map(|b| b.close)
            .ok_or(DataError::NoDataAvailable)
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 45000.0 + i as f64;
                Bar::new(i as i64 * 300_000, c, c, c, c, 1000.0)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_reveals_one_bar_per_fetch() {
        let feed = ReplayFeed::new("BTC/USDT", Timeframe::Minute5, bars(5), 3);

        let first = feed.fetch_bars("BTC/USDT", Timeframe::Minute5, 250).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(feed.latest_price("BTC/USDT").await.unwrap(), 45002.0);

        let second = feed.fetch_bars("BTC/USDT", Timeframe::Minute5, 2).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].close, 45003.0);

        feed.fetch_bars("BTC/USDT", Timeframe::Minute5, 250).await.unwrap();
        assert_eq!(feed.remaining(), 0);
        assert!(matches!(
            feed.fetch_bars("BTC/USDT", Timeframe::Minute5, 250).await,
            Err(DataError::NoDataAvailable)
        ));
    }

    #[tokio::test]
    async fn test_rejects_other_instruments() {
        let feed = ReplayFeed::new("BTC/USDT", Timeframe::Minute5, bars(5), 3);
        assert!(matches!(
            feed.fetch_bars("ETH/USDT", Timeframe::Minute5, 10).await,
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let feed = ReplayFeed::new("BTC/USDT", Timeframe::Minute5, Vec::new(), 60);
        assert!(feed.fetch_bars("BTC/USDT", Timeframe::Minute5, 10).await.is_err());
        assert!(feed.latest_price("BTC/USDT").await.is_err());
    }
}
