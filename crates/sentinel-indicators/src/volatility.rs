//! Volatility indicators.

use sentinel_core::traits::{BarIndicator, Indicator};
use sentinel_core::Bar;
use serde::{Deserialize, Serialize};

use crate::moving_average::wilder;
use crate::simd::mean_std_simd;

/// Average True Range, Wilder-smoothed.
#[derive(Debug, Clone, Copy)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "ATR period must be positive");
        Self { period }
    }

    /// Mean true range of the last `period` bars divided by the last close.
    ///
    /// Zero when fewer than `period + 1` bars are available or the close is
    /// zero.
    pub fn normalized(&self, bars: &[Bar]) -> f64 {
        if bars.len() < self.lookback() {
            return 0.0;
        }
        let window = &bars[bars.len() - self.lookback()..];
        match (self.latest(window), window.last()) {
            (Some(atr), Some(last)) if last.close != 0.0 => atr / last.close,
            _ => 0.0,
        }
    }
}

impl BarIndicator for Atr {
    type Output = f64;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        if bars.len() < self.lookback() {
            return Vec::new();
        }
        let ranges: Vec<f64> = bars
            .windows(2)
            .map(|pair| pair[1].true_range(Some(pair[0].close)))
            .collect();
        wilder(&ranges, self.period)
    }

    /// The first bar only supplies a previous close.
    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger band values at one position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// SMA of the window
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
    /// (price - lower) / (upper - lower); 0.5 when the bands are collapsed
    pub percent_b: f64,
}

impl BollingerOutput {
    /// Bands `k` standard deviations around `mean`, evaluated at `price`.
    pub fn around(mean: f64, std_dev: f64, k: f64, price: f64) -> Self {
        let upper = mean + k * std_dev;
        let lower = mean - k * std_dev;
        let width = upper - lower;
        Self {
            upper,
            middle: mean,
            lower,
            bandwidth: if mean != 0.0 { width / mean } else { 0.0 },
            percent_b: if width > 0.0 { (price - lower) / width } else { 0.5 },
        }
    }

    /// Collapsed bands at `price`, used before the window fills.
    pub fn flat(price: f64) -> Self {
        Self::around(price, 0.0, 0.0, price)
    }

    /// Price above the upper band.
    pub fn is_overbought(&self, price: f64) -> bool {
        price > self.upper
    }

    /// Price below the lower band.
    pub fn is_oversold(&self, price: f64) -> bool {
        price < self.lower
    }
}

/// Bollinger Bands: SMA middle band with bands at k population standard
/// deviations.
#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    period: usize,
    k: f64,
}

impl BollingerBands {
    pub fn with_params(period: usize, k: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(k > 0.0, "Band width must be positive");
        Self { period, k }
    }
}

impl Default for BollingerBands {
    /// 20 periods, 2 standard deviations
    fn default() -> Self {
        Self::with_params(20, 2.0)
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        data.windows(self.period)
            .map(|window| {
                let (mean, std_dev) = mean_std_simd(window);
                BollingerOutput::around(mean, std_dev, self.k, window[window.len() - 1])
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}
