//! Indicator trait definitions.

use crate::error::IndicatorError;
use crate::types::Bar;

/// Indicator over a value series (closes, volumes).
///
/// `calculate` yields one output per position once `lookback()` values are
/// available, oldest first, and nothing for a shorter series; callers
/// substitute neutral defaults.
pub trait Indicator: Send + Sync {
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Values needed before the first output.
    fn lookback(&self) -> usize;

    fn name(&self) -> &str;

    /// Output at the last position.
    fn latest(&self, data: &[f64]) -> Option<Self::Output> {
        self.calculate(data).pop()
    }

    fn check_window(&self, available: usize) -> Result<(), IndicatorError> {
        check(self.lookback(), available)
    }
}

/// Indicator that needs full bars (high/low ranges), e.g. ATR or Stochastic.
pub trait BarIndicator: Send + Sync {
    type Output;

    fn calculate(&self, bars: &[Bar]) -> Vec<Self::Output>;

    /// Bars needed before the first output.
    fn lookback(&self) -> usize;

    fn name(&self) -> &str;

    fn latest(&self, bars: &[Bar]) -> Option<Self::Output> {
        self.calculate(bars).pop()
    }

    fn check_window(&self, available: usize) -> Result<(), IndicatorError> {
        check(self.lookback(), available)
    }
}

fn check(required: usize, available: usize) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData {
            required,
            available,
        });
    }
    Ok(())
}
