//! Candle type shared by feeds, indicators and the backtest.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle. Prices are f64 since they only feed indicator math;
/// money is Decimal everywhere else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time, Unix milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close-over-close change in percent; zero against a zero close.
    pub fn change_pct(&self, prev_close: f64) -> f64 {
        if prev_close == 0.0 {
            return 0.0;
        }
        (self.close / prev_close - 1.0) * 100.0
    }

    /// Open time as UTC. Out-of-range timestamps map to the epoch.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// UTC calendar day, used for daily counter rollovers.
    pub fn date(&self) -> NaiveDate {
        self.datetime().date_naive()
    }

    /// High-low range, widened to reach a gapped previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let range = self.high - self.low;
        prev_close.map_or(range, |pc| {
            range.max((self.high - pc).abs()).max((self.low - pc).abs())
        })
    }
}
