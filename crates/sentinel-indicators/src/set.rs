//! Per-cycle indicator snapshot.
//!
//! `IndicatorEngine::compute` is a pure function of a trailing bar window
//! (plus an optional long-horizon series). It never fails: any indicator whose
//! window is not yet filled takes a neutral value instead.

use sentinel_core::error::IndicatorError;
use sentinel_core::traits::{BarIndicator, Indicator};
use sentinel_core::Bar;
use serde::{Deserialize, Serialize};

use crate::momentum::{Macd, MacdOutput, Rsi, Stochastic, StochasticOutput};
use crate::moving_average::{Ema, Sma};
use crate::volatility::{Atr, BollingerBands, BollingerOutput};

/// Indicator periods. Defaults match the fusion and risk thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub ema_pullback: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub atr_period: usize,
    pub volume_period: usize,
    pub long_ma_fast: usize,
    pub long_ma_slow: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            sma_fast: 20,
            sma_slow: 50,
            ema_pullback: 20,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stoch_k: 14,
            stoch_d: 3,
            atr_period: 24,
            volume_period: 20,
            long_ma_fast: 50,
            long_ma_slow: 200,
        }
    }
}

impl IndicatorParams {
    /// Bars needed before every short-horizon indicator is live.
    pub fn min_bars(&self) -> usize {
        [
            self.rsi_period + 1,
            (self.macd_slow + self.macd_signal).saturating_sub(1),
            self.sma_slow,
            self.bollinger_period,
            (self.stoch_k + self.stoch_d).saturating_sub(1),
            self.atr_period + 1,
            self.volume_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Reject periods the indicators cannot be built with.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_signal", self.macd_signal),
            ("sma_fast", self.sma_fast),
            ("sma_slow", self.sma_slow),
            ("ema_pullback", self.ema_pullback),
            ("stoch_k", self.stoch_k),
            ("stoch_d", self.stoch_d),
            ("atr_period", self.atr_period),
            ("volume_period", self.volume_period),
            ("long_ma_fast", self.long_ma_fast),
            ("long_ma_slow", self.long_ma_slow),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(IndicatorError::InvalidParameter(format!("{} must be positive", name)));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(IndicatorError::InvalidParameter(
                "macd_fast must be less than macd_slow".into(),
            ));
        }
        if self.bollinger_period < 2 || self.bollinger_k <= 0.0 {
            return Err(IndicatorError::InvalidParameter(
                "Bollinger bands need at least 2 periods and a positive width".into(),
            ));
        }
        Ok(())
    }
}

/// Indicator values for the latest bar of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Last close
    pub price: f64,
    /// Last bar volume
    pub volume: f64,
    pub rsi: f64,
    pub macd: MacdOutput,
    pub sma20: f64,
    pub sma50: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub ema20: f64,
    /// Long-horizon fast MA (50)
    pub long_ma: f64,
    /// Long-horizon slow MA (200)
    pub long_ma2: f64,
    pub bollinger: BollingerOutput,
    pub stochastic: StochasticOutput,
    pub volume_sma20: f64,
    /// ATR divided by price
    pub atr_pct: f64,
    pub bars_available: usize,
    pub warmed_up: bool,
}

impl IndicatorSet {
    /// Neutral snapshot at `price`: RSI 50, MACD 0, every average and band at price.
    pub fn neutral(price: f64) -> Self {
        Self {
            price,
            volume: 0.0,
            rsi: 50.0,
            macd: MacdOutput::default(),
            sma20: price,
            sma50: price,
            ema12: price,
            ema26: price,
            ema20: price,
            long_ma: price,
            long_ma2: price,
            bollinger: BollingerOutput::flat(price),
            stochastic: StochasticOutput::default(),
            volume_sma20: 0.0,
            atr_pct: 0.0,
            bars_available: 0,
            warmed_up: false,
        }
    }

    /// Relative distance of price from EMA20.
    pub fn ema20_distance(&self) -> f64 {
        if self.ema20 == 0.0 {
            return 0.0;
        }
        (self.price - self.ema20).abs() / self.ema20
    }

    /// True if every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.price,
            self.volume,
            self.rsi,
            self.macd.macd,
            self.macd.signal,
            self.macd.histogram,
            self.sma20,
            self.sma50,
            self.ema12,
            self.ema26,
            self.ema20,
            self.long_ma,
            self.long_ma2,
            self.bollinger.upper,
            self.bollinger.middle,
            self.bollinger.lower,
            self.stochastic.k,
            self.stochastic.d,
            self.volume_sma20,
            self.atr_pct,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Computes an `IndicatorSet` from a bar window.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    rsi: Rsi,
    macd: Macd,
    sma_fast: Sma,
    sma_slow: Sma,
    ema12: Ema,
    ema26: Ema,
    ema_pullback: Ema,
    bollinger: BollingerBands,
    stochastic: Stochastic,
    atr: Atr,
    volume_sma: Sma,
    long_fast: Sma,
    long_slow: Sma,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(IndicatorParams::default())
    }
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self {
            rsi: Rsi::new(params.rsi_period),
            macd: Macd::with_periods(params.macd_fast, params.macd_slow, params.macd_signal),
            sma_fast: Sma::new(params.sma_fast),
            sma_slow: Sma::new(params.sma_slow),
            ema12: Ema::new(params.macd_fast),
            ema26: Ema::new(params.macd_slow),
            ema_pullback: Ema::new(params.ema_pullback),
            bollinger: BollingerBands::with_params(params.bollinger_period, params.bollinger_k),
            stochastic: Stochastic::with_periods(params.stoch_k, params.stoch_d),
            atr: Atr::new(params.atr_period),
            volume_sma: Sma::new(params.volume_period),
            long_fast: Sma::new(params.long_ma_fast),
            long_slow: Sma::new(params.long_ma_slow),
            params,
        }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Compute the snapshot for the last bar of `bars`.
    ///
    /// Long-horizon MAs come from `long_horizon` when given (e.g. daily bars),
    /// otherwise from `bars` itself.
    pub fn compute(&self, bars: &[Bar], long_horizon: Option<&[Bar]>) -> IndicatorSet {
        let Some(last) = bars.last() else {
            return IndicatorSet::neutral(0.0);
        };
        let price = last.close;

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let long_closes: Vec<f64> = match long_horizon {
            Some(series) if !series.is_empty() => series.iter().map(|b| b.close).collect(),
            _ => closes.clone(),
        };

        let macd = self.macd.latest(&closes).unwrap_or_default();
        let bollinger = self
            .bollinger
            .latest(&closes)
            .unwrap_or_else(|| BollingerOutput::flat(price));
        let stochastic = self.stochastic.latest(bars).unwrap_or_default();

        IndicatorSet {
            price,
            volume: last.volume,
            rsi: self.rsi.latest(&closes).unwrap_or(50.0),
            macd,
            sma20: self.sma_fast.latest(&closes).unwrap_or(price),
            sma50: self.sma_slow.latest(&closes).unwrap_or(price),
            ema12: self.ema12.latest(&closes).unwrap_or(price),
            ema26: self.ema26.latest(&closes).unwrap_or(price),
            ema20: self.ema_pullback.latest(&closes).unwrap_or(price),
            long_ma: self.long_fast.latest(&long_closes).unwrap_or(price),
            long_ma2: self.long_slow.latest(&long_closes).unwrap_or(price),
            bollinger,
            stochastic,
            volume_sma20: self.volume_sma.latest(&volumes).unwrap_or(0.0),
            atr_pct: self.atr.normalized(bars),
            bars_available: bars.len(),
            warmed_up: bars.len() >= self.params.min_bars(),
        }
    }
}
