//! Entry sizing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assessor::{RiskAssessment, RiskConfig};

/// How entry size is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Base trade amount scaled by the risk multiplier, capped at max position size
    #[default]
    RiskScaled,
    /// Fixed fraction of equity at risk between entry and stop, capped at a
    /// fraction of equity
    StopDistance,
}

/// Position sizer for long entries.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    mode: SizingMode,
    risk_per_trade: Decimal,
    max_position_fraction: Decimal,
    max_position_size: Decimal,
}

impl PositionSizer {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            mode: config.sizing_mode,
            risk_per_trade: config.risk_per_trade,
            max_position_fraction: config.max_position_fraction,
            max_position_size: config.max_position_size,
        }
    }

    pub fn mode(&self) -> SizingMode {
        self.mode
    }

    /// Entry size in base-asset units.
    ///
    /// `balance` is the account value in quote currency; `stop` the protective
    /// stop price for the entry.
    pub fn calculate(
        &self,
        assessment: &RiskAssessment,
        balance: Decimal,
        entry: Decimal,
        stop: Decimal,
    ) -> Decimal {
        if entry <= Decimal::ZERO || assessment.recommended_position_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        match self.mode {
            SizingMode::RiskScaled => assessment.recommended_position_size,
            SizingMode::StopDistance => {
                let risk_per_unit = (entry - stop).abs();
                if risk_per_unit == Decimal::ZERO {
                    return Decimal::ZERO;
                }
                let at_risk = balance * self.risk_per_trade;
                let value = (at_risk / risk_per_unit * entry).min(balance * self.max_position_fraction);
                (value / entry).min(self.max_position_size)
            }
        }
    }
}
