//! Moving averages and the smoothing they share with RSI and ATR.

use sentinel_core::traits::Indicator;

use crate::simd::{mean_simd, sum_simd};

/// Simple moving average.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be positive");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return Vec::new();
        }
        let n = self.period as f64;
        let seed = sum_simd(&data[..self.period]);

        // Slide the window: add the incoming value, drop the outgoing one
        let rolled = data[self.period..]
            .iter()
            .zip(data)
            .scan(seed, |sum, (incoming, outgoing)| {
                *sum += incoming - outgoing;
                Some(*sum / n)
            });
        std::iter::once(seed / n).chain(rolled).collect()
    }

    /// Mean of the trailing window only.
    fn latest(&self, data: &[f64]) -> Option<f64> {
        (data.len() >= self.period).then(|| mean_simd(&data[data.len() - self.period..]))
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential moving average, alpha = 2 / (period + 1).
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be positive");
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        smooth(data, self.period, ema_alpha(self.period))
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

pub(crate) fn ema_alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Wilder's average (alpha = 1 / period).
pub(crate) fn wilder(data: &[f64], period: usize) -> Vec<f64> {
    smooth(data, period, 1.0 / period as f64)
}

/// Exponential smoothing seeded with the mean of the first `period` values.
/// The first output sits at index `period - 1` of `data`.
pub(crate) fn smooth(data: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let seed = mean_simd(&data[..period]);
    let mut out = Vec::with_capacity(data.len() - period + 1);
    out.push(seed);
    data[period..].iter().fold(seed, |prev, &value| {
        let next = prev + alpha * (value - prev);
        out.push(next);
        next
    });
    out
}
