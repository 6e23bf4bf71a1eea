//! Momentum indicators.

use sentinel_core::traits::{BarIndicator, Indicator};
use sentinel_core::Bar;
use serde::{Deserialize, Serialize};

use crate::moving_average::{ema_alpha, smooth, wilder};
use crate::simd::mean_simd;

/// Relative Strength Index with Wilder-smoothed gains and losses.
///
/// A window with neither gains nor losses reads 50.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be positive");
        Self { period }
    }
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain > 0.0, avg_loss > 0.0) {
        (_, true) => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
        (true, false) => 100.0,
        (false, false) => 50.0,
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.lookback() {
            return Vec::new();
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|pair| {
                let change = pair[1] - pair[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        wilder(&gains, self.period)
            .into_iter()
            .zip(wilder(&losses, self.period))
            .map(|(gain, loss)| rsi_from(gain, loss))
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA - slow EMA
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && signal > 0, "MACD periods must be positive");
        assert!(fast < slow, "Fast period must be less than slow period");
        Self { fast, slow, signal }
    }
}

impl Default for Macd {
    /// 12 / 26 / 9
    fn default() -> Self {
        Self::with_periods(12, 26, 9)
    }
}

impl Indicator for Macd {
    type Output = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.lookback() {
            return Vec::new();
        }

        let fast = smooth(data, self.fast, ema_alpha(self.fast));
        let slow = smooth(data, self.slow, ema_alpha(self.slow));

        // Both EMAs end on the last value; drop the fast EMA's extra head
        let line: Vec<f64> = fast[self.slow - self.fast..]
            .iter()
            .zip(&slow)
            .map(|(f, s)| f - s)
            .collect();
        let signal = smooth(&line, self.signal, ema_alpha(self.signal));

        line[self.signal - 1..]
            .iter()
            .zip(signal)
            .map(|(&macd, signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal - 1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

/// Stochastic %K and %D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticOutput {
    /// Close within the high-low range of the %K window, 0-100
    pub k: f64,
    /// Mean of the last %D values of %K
    pub d: f64,
}

impl Default for StochasticOutput {
    fn default() -> Self {
        Self { k: 50.0, d: 50.0 }
    }
}

/// Stochastic oscillator over bar highs and lows. A flat range reads 50.
#[derive(Debug, Clone, Copy)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    pub fn with_periods(k_period: usize, d_period: usize) -> Self {
        assert!(k_period > 0 && d_period > 0, "Stochastic periods must be positive");
        Self { k_period, d_period }
    }

    fn percent_k(window: &[Bar]) -> f64 {
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        match window.last() {
            Some(bar) if high > low => (bar.close - low) / (high - low) * 100.0,
            _ => 50.0,
        }
    }
}

impl Default for Stochastic {
    /// 14 / 3
    fn default() -> Self {
        Self::with_periods(14, 3)
    }
}

impl BarIndicator for Stochastic {
    type Output = StochasticOutput;

    fn calculate(&self, bars: &[Bar]) -> Vec<StochasticOutput> {
        if bars.len() < self.lookback() {
            return Vec::new();
        }

        let k: Vec<f64> = bars.windows(self.k_period).map(Self::percent_k).collect();
        k.windows(self.d_period)
            .map(|w| StochasticOutput {
                k: w[w.len() - 1],
                d: mean_simd(w),
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn name(&self) -> &str {
        "Stochastic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(high: &[f64], low: &[f64], close: &[f64]) -> Vec<Bar> {
        (0..close.len())
            .map(|i| Bar::new(i as i64, close[i], high[i], low[i], close[i], 1.0))
            .collect()
    }

    #[test]
    fn test_rsi_bounded() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0 + (i as f64 * 1.3).cos())
            .collect();

        let result = rsi.calculate(&data);
        assert_eq!(result.len(), data.len() - 14);
        assert!(result.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_extremes() {
        let rsi = Rsi::new(5);
        let rising = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let falling = [7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((rsi.latest(&rising).unwrap() - 100.0).abs() < 1e-10);
        assert!(rsi.latest(&falling).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_rsi_flat_window_is_neutral() {
        let rsi = Rsi::new(14);
        assert!((rsi.latest(&[45000.0; 30]).unwrap() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let rsi = Rsi::new(14);
        assert!(rsi.latest(&[1.0; 14]).is_none());
        assert_eq!(rsi.lookback(), 15);
    }

    #[test]
    fn test_macd_uptrend() {
        let data: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let last = Macd::default().latest(&data).unwrap();
        assert!(last.macd > 0.0);
    }

    #[test]
    fn test_macd_flat_is_zero() {
        let last = Macd::default().latest(&[45000.0; 40]).unwrap();
        assert!(last.macd.abs() < 1e-9);
        assert!(last.histogram.abs() < 1e-9);
    }

    #[test]
    fn test_macd_first_output() {
        let macd = Macd::default();
        assert_eq!(macd.lookback(), 34);
        assert!(macd.calculate(&[1.0; 33]).is_empty());
        assert_eq!(macd.calculate(&[1.0; 34]).len(), 1);
        assert_eq!(macd.calculate(&[1.0; 40]).len(), 7);
    }

    #[test]
    fn test_stochastic_bounds() {
        let high: Vec<f64> = (0..30).map(|i| 105.0 + i as f64).collect();
        let low: Vec<f64> = (0..30).map(|i| 95.0 + i as f64).collect();
        let close: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();

        let result = Stochastic::default().calculate(&bars(&high, &low, &close));
        assert_eq!(result.len(), 30 - 15);
        for output in &result {
            assert!((0.0..=100.0).contains(&output.k));
            assert!((0.0..=100.0).contains(&output.d));
        }
    }

    #[test]
    fn test_stochastic_close_at_high() {
        let high = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0];
        let low = [5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let last = Stochastic::with_periods(5, 3).latest(&bars(&high, &low, &high)).unwrap();
        assert!((last.k - 100.0).abs() < 1e-10);
        assert!((last.d - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_stochastic_flat_range() {
        let flat = [45000.0; 20];
        let last = Stochastic::default().latest(&bars(&flat, &flat, &flat)).unwrap();
        assert_eq!(last, StochasticOutput::default());
    }
}
