//! Trend classification.
//!
//! Labels the market along two horizons. The long horizon compares price with
//! the 50/200 moving averages and selects the fusion mode; the short horizon
//! describes direction, strength, support/resistance and volume conditions.

use sentinel_core::Bar;
use sentinel_indicators::{simd, IndicatorSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "UP"),
            TrendDirection::Down => write!(f, "DOWN"),
            TrendDirection::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// Strength of the last bar-over-bar move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

/// Current volume relative to its average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeRegime {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeState {
    pub regime: VolumeRegime,
    pub trend: VolumeTrend,
    /// Current volume / average volume (0 when the average is 0)
    pub ratio: f64,
}

/// Short-horizon trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortTrend {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    /// Bar-over-bar close change in percent
    pub change_pct: f64,
    pub support: f64,
    pub resistance: f64,
    pub volume: VolumeState,
}

/// Long-horizon trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongTrend {
    pub direction: TrendDirection,
}

/// Both horizons, as consumed by fusion and risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub short: ShortTrend,
    pub long: LongTrend,
}

/// Thresholds for trend classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// |change| above this percent is STRONG
    pub strong_change_pct: f64,
    /// |change| above this percent is MODERATE
    pub moderate_change_pct: f64,
    /// Bars scanned for support/resistance
    pub support_lookback: usize,
    pub volume_high_ratio: f64,
    pub volume_low_ratio: f64,
    /// Bars compared for the volume trend
    pub volume_trend_lookback: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            strong_change_pct: 2.0,
            moderate_change_pct: 0.5,
            support_lookback: 10,
            volume_high_ratio: 1.5,
            volume_low_ratio: 0.8,
            volume_trend_lookback: 5,
        }
    }
}

/// Classifies short and long horizon trends from bars and their indicators.
#[derive(Debug, Clone, Default)]
pub struct TrendClassifier {
    config: TrendConfig,
}

impl TrendClassifier {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, bars: &[Bar], indicators: &IndicatorSet) -> MarketContext {
        MarketContext {
            short: self.short_trend(bars, indicators),
            long: LongTrend {
                direction: Self::long_direction(indicators),
            },
        }
    }

    /// UP if price > MA50 > MA200, DOWN if price < MA50 < MA200.
    pub fn long_direction(ind: &IndicatorSet) -> TrendDirection {
        ordering(ind.price, ind.long_ma, ind.long_ma2)
    }

    fn short_trend(&self, bars: &[Bar], ind: &IndicatorSet) -> ShortTrend {
        let change_pct = match bars {
            [.., prev, last] => last.change_pct(prev.close),
            _ => 0.0,
        };

        let abs_change = change_pct.abs();
        let strength = if abs_change > self.config.strong_change_pct {
            TrendStrength::Strong
        } else if abs_change > self.config.moderate_change_pct {
            TrendStrength::Moderate
        } else {
            TrendStrength::Weak
        };

        let start = bars.len().saturating_sub(self.config.support_lookback);
        let recent: Vec<f64> = bars[start..].iter().map(|b| b.close).collect();
        let (support, resistance) = simd::minmax_simd(&recent).unwrap_or((ind.price, ind.price));

        ShortTrend {
            direction: ordering(ind.price, ind.sma20, ind.sma50),
            strength,
            change_pct,
            support,
            resistance,
            volume: self.volume_state(bars, ind),
        }
    }

    fn volume_state(&self, bars: &[Bar], ind: &IndicatorSet) -> VolumeState {
        let (regime, ratio) = if ind.volume_sma20 > 0.0 {
            let ratio = ind.volume / ind.volume_sma20;
            let regime = if ratio > self.config.volume_high_ratio {
                VolumeRegime::High
            } else if ratio < self.config.volume_low_ratio {
                VolumeRegime::Low
            } else {
                VolumeRegime::Medium
            };
            (regime, ratio)
        } else {
            (VolumeRegime::Medium, 0.0)
        };

        let start = bars.len().saturating_sub(self.config.volume_trend_lookback);
        let trend = match &bars[start..] {
            [first, .., last] if last.volume > first.volume => VolumeTrend::Increasing,
            _ => VolumeTrend::Decreasing,
        };

        VolumeState {
            regime,
            trend,
            ratio,
        }
    }
}

fn ordering(price: f64, fast: f64, slow: f64) -> TrendDirection {
    if price > fast && fast > slow {
        TrendDirection::Up
    } else if price < fast && fast < slow {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_indicators::IndicatorEngine;

    fn bars_from(closes: &[f64], volume: impl Fn(usize) -> f64) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 300_000, c, c + 10.0, c - 10.0, c, volume(i)))
            .collect()
    }

    fn classify(bars: &[Bar]) -> MarketContext {
        let ind = IndicatorEngine::default().compute(bars, None);
        TrendClassifier::default().classify(bars, &ind)
    }

    #[test]
    fn test_rising_series_is_long_uptrend() {
        let closes: Vec<f64> = (0..200).map(|i| 45000.0 + 50.0 * i as f64).collect();
        let ctx = classify(&bars_from(&closes, |_| 1000.0));

        assert_eq!(ctx.long.direction, TrendDirection::Up);
        assert_eq!(ctx.short.direction, TrendDirection::Up);
        assert_eq!(ctx.short.strength, TrendStrength::Weak);
        assert_eq!(ctx.short.resistance, *closes.last().unwrap());
        assert_eq!(ctx.short.support, closes[190]);
    }

    #[test]
    fn test_falling_series_is_long_downtrend() {
        let closes: Vec<f64> = (0..200).map(|i| 60000.0 - 50.0 * i as f64).collect();
        let ctx = classify(&bars_from(&closes, |_| 1000.0));
        assert_eq!(ctx.long.direction, TrendDirection::Down);
        assert_eq!(ctx.short.direction, TrendDirection::Down);
    }

    #[test]
    fn test_flat_series_is_sideways() {
        let ctx = classify(&bars_from(&[45000.0; 200], |_| 1000.0));

        assert_eq!(ctx.long.direction, TrendDirection::Sideways);
        assert_eq!(ctx.short.direction, TrendDirection::Sideways);
        assert_eq!(ctx.short.change_pct, 0.0);
        assert_eq!(ctx.short.volume.regime, VolumeRegime::Medium);
        assert_eq!(ctx.short.volume.trend, VolumeTrend::Decreasing);
    }

    #[test]
    fn test_strength_thresholds() {
        let mut closes = vec![45000.0; 60];
        closes.push(45000.0 * 1.03);
        assert_eq!(classify(&bars_from(&closes, |_| 1.0)).short.strength, TrendStrength::Strong);

        closes.pop();
        closes.push(45000.0 * 1.01);
        assert_eq!(classify(&bars_from(&closes, |_| 1.0)).short.strength, TrendStrength::Moderate);
    }

    #[test]
    fn test_volume_spike_is_high_and_increasing() {
        let closes = vec![45000.0; 60];
        let bars = bars_from(&closes, |i| if i == 59 { 5000.0 } else { 1000.0 });
        let volume = classify(&bars).short.volume;

        assert_eq!(volume.regime, VolumeRegime::High);
        assert_eq!(volume.trend, VolumeTrend::Increasing);
        assert!(volume.ratio > 1.5);
    }

    #[test]
    fn test_zero_average_volume_is_medium() {
        let ctx = classify(&bars_from(&[45000.0; 60], |_| 0.0));
        assert_eq!(ctx.short.volume.regime, VolumeRegime::Medium);
        assert_eq!(ctx.short.volume.ratio, 0.0);
    }

    #[test]
    fn test_single_bar() {
        let bars = bars_from(&[45000.0], |_| 1000.0);
        let ctx = classify(&bars);
        assert_eq!(ctx.short.support, 45000.0);
        assert_eq!(ctx.short.change_pct, 0.0);
        assert_eq!(ctx.long.direction, TrendDirection::Sideways);
    }
}
