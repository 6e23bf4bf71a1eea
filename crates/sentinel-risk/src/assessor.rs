//! Five-factor risk assessment.
//!
//! The score is a weighted sum of volatility, technical instability,
//! prediction confidence, position exposure and trading frequency, clamped
//! to [0, 1]. The score maps to a level, a position-size multiplier and the
//! stop/take-profit distances for the next entry.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::error::RiskError;
use sentinel_core::{ExternalPrediction, Position, TradingError};
use sentinel_indicators::IndicatorSet;
use sentinel_signals::{MarketContext, TrendDirection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::position_sizer::SizingMode;

const VOLATILITY_WEIGHT: f64 = 0.25;
const TECHNICAL_WEIGHT: f64 = 0.20;
const PREDICTION_WEIGHT: f64 = 0.20;
const EXPOSURE_WEIGHT: f64 = 0.25;
const FREQUENCY_WEIGHT: f64 = 0.10;

/// Scores are compared at this resolution.
const SCORE_SCALE: f64 = 1e9;

/// Risk level derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// HIGH >= 0.7, MEDIUM >= 0.4, else LOW.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Per-factor scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub volatility: f64,
    pub technical: f64,
    pub prediction: f64,
    pub exposure: f64,
    pub frequency: f64,
}

impl RiskFactors {
    pub fn weighted_score(&self) -> f64 {
        self.volatility * VOLATILITY_WEIGHT
            + self.technical * TECHNICAL_WEIGHT
            + self.prediction * PREDICTION_WEIGHT
            + self.exposure * EXPOSURE_WEIGHT
            + self.frequency * FREQUENCY_WEIGHT
    }
}

/// Result of a risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Score in [0, 1]
    pub score: f64,
    pub factors: RiskFactors,
    pub position_multiplier: Decimal,
    /// Recommended entry size in base-asset units
    pub recommended_position_size: Decimal,
    /// Stop-loss distance from entry, in percent
    pub stop_loss_distance: Decimal,
    /// Take-profit distance from entry, in percent
    pub take_profit_distance: Decimal,
    pub notes: Vec<String>,
}

impl RiskAssessment {
    /// HIGH risk, zero size. Returned whenever scoring fails.
    pub fn fail_safe(reason: impl Into<String>, config: &RiskConfig) -> Self {
        Self {
            level: RiskLevel::High,
            score: 1.0,
            factors: RiskFactors::default(),
            position_multiplier: Decimal::ZERO,
            recommended_position_size: Decimal::ZERO,
            stop_loss_distance: config.stop_loss_pct,
            take_profit_distance: config.take_profit_pct,
            notes: vec![format!("Fail-safe: {}", reason.into())],
        }
    }

    /// Stop-loss and take-profit prices for a long entry at `entry`.
    pub fn exit_levels(&self, entry: Decimal) -> (Decimal, Decimal) {
        (
            entry * (Decimal::ONE - self.stop_loss_distance / Decimal::ONE_HUNDRED),
            entry * (Decimal::ONE + self.take_profit_distance / Decimal::ONE_HUNDRED),
        )
    }
}

/// Risk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Base entry size in base-asset units
    pub trade_amount: Decimal,
    /// Hard cap on entry size in base-asset units
    pub max_position_size: Decimal,
    /// Upper bound on the position multiplier
    pub max_multiplier: Decimal,
    pub max_daily_trades: u32,
    /// Base stop-loss distance in percent
    pub stop_loss_pct: Decimal,
    /// Base take-profit distance in percent
    pub take_profit_pct: Decimal,
    /// |MACD histogram| below this fraction of price counts as a near-cross
    pub macd_near_cross_pct: f64,
    /// Holding period after which exposure risk rises
    pub max_hold_hours: f64,
    pub sizing_mode: SizingMode,
    /// Equity fraction risked per trade in stop-distance sizing
    pub risk_per_trade: Decimal,
    /// Equity fraction cap on position value in stop-distance sizing
    pub max_position_fraction: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trade_amount: dec!(0.001),
            max_position_size: dec!(0.01),
            max_multiplier: dec!(1.2),
            max_daily_trades: 10,
            stop_loss_pct: dec!(1.0),
            take_profit_pct: dec!(0.4),
            macd_near_cross_pct: 0.0001,
            max_hold_hours: 24.0,
            sizing_mode: SizingMode::RiskScaled,
            risk_per_trade: dec!(0.005),
            max_position_fraction: dec!(0.10),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), TradingError> {
        if self.trade_amount <= Decimal::ZERO || self.max_position_size <= Decimal::ZERO {
            return Err(TradingError::Config(
                "Trade amount and max position size must be positive".into(),
            ));
        }
        if self.max_daily_trades == 0 {
            return Err(TradingError::Config("Max daily trades must be at least 1".into()));
        }
        let pct_range = Decimal::ZERO..Decimal::ONE_HUNDRED;
        if !pct_range.contains(&self.stop_loss_pct) || self.stop_loss_pct == Decimal::ZERO {
            return Err(TradingError::Config("Stop-loss percent must be within (0, 100)".into()));
        }
        if !pct_range.contains(&self.take_profit_pct) || self.take_profit_pct == Decimal::ZERO {
            return Err(TradingError::Config(
                "Take-profit percent must be within (0, 100)".into(),
            ));
        }
        if self.max_multiplier <= Decimal::ZERO {
            return Err(TradingError::Config("Max multiplier must be positive".into()));
        }
        if self.risk_per_trade <= Decimal::ZERO
            || self.max_position_fraction <= Decimal::ZERO
            || self.max_position_fraction > Decimal::ONE
        {
            return Err(TradingError::Config(
                "Stop-distance sizing fractions must be within (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the assessor looks at for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub indicators: &'a IndicatorSet,
    pub context: &'a MarketContext,
    pub prediction: Option<&'a ExternalPrediction>,
    pub position: Option<&'a Position>,
    pub daily_trades: u32,
    pub now: DateTime<Utc>,
}

/// Scores risk and recommends size and exit distances.
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor {
    config: RiskConfig,
}

impl RiskAssessor {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Assess risk. Never fails: scoring errors yield a fail-safe HIGH assessment.
    pub fn assess(&self, input: &RiskInput<'_>) -> RiskAssessment {
        match self.try_assess(input) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "Risk scoring failed, using fail-safe assessment");
                RiskAssessment::fail_safe(e.to_string(), &self.config)
            }
        }
    }

    pub fn try_assess(&self, input: &RiskInput<'_>) -> Result<RiskAssessment, RiskError> {
        let ind = input.indicators;
        if !ind.is_finite() {
            return Err(RiskError::NonFinite("indicators"));
        }
        if ind.price <= 0.0 {
            return Err(RiskError::InvalidInput(format!("price {}", ind.price)));
        }

        let mut notes = Vec::new();
        let factors = RiskFactors {
            volatility: self.volatility_factor(ind, &mut notes),
            technical: self.technical_factor(ind, input.context, &mut notes),
            prediction: self.prediction_factor(input.prediction, &mut notes)?,
            exposure: self.exposure_factor(input, &mut notes)?,
            frequency: self.frequency_factor(input.daily_trades, &mut notes),
        };

        let score = factors.weighted_score();
        if !score.is_finite() {
            return Err(RiskError::NonFinite("score"));
        }
        // 0.8 * 0.25 + 0.7 * 0.2 + 0.6 * 0.1 is 0.39999999999999997 in f64
        let score = (score.clamp(0.0, 1.0) * SCORE_SCALE).round() / SCORE_SCALE;
        let level = RiskLevel::from_score(score);

        // Higher risk: smaller size, tighter exits
        let (multiplier, stop_scale, take_scale) = if score >= 0.7 {
            (dec!(0.2), dec!(0.5), dec!(0.7))
        } else if score >= 0.5 {
            (dec!(0.5), dec!(0.8), dec!(0.9))
        } else if score >= 0.3 {
            (dec!(0.8), dec!(1.0), dec!(1.0))
        } else {
            (dec!(1.2), dec!(1.5), dec!(1.3))
        };
        let position_multiplier = multiplier.min(self.config.max_multiplier);
        let recommended_position_size =
            (self.config.trade_amount * position_multiplier).min(self.config.max_position_size);

        debug!(
            score,
            level = ?level,
            volatility = factors.volatility,
            technical = factors.technical,
            prediction = factors.prediction,
            exposure = factors.exposure,
            frequency = factors.frequency,
            "Risk assessed"
        );

        Ok(RiskAssessment {
            level,
            score,
            factors,
            position_multiplier,
            recommended_position_size,
            stop_loss_distance: self.config.stop_loss_pct * stop_scale,
            take_profit_distance: self.config.take_profit_pct * take_scale,
            notes,
        })
    }

    fn volatility_factor(&self, ind: &IndicatorSet, notes: &mut Vec<String>) -> f64 {
        let atr_pct = ind.atr_pct;
        let factor = if atr_pct > 0.05 {
            0.8
        } else if atr_pct > 0.03 {
            0.6
        } else if atr_pct > 0.02 {
            0.4
        } else {
            0.2
        };
        if factor >= 0.6 {
            notes.push(format!("High volatility: ATR {:.2}% of price", atr_pct * 100.0));
        }
        factor
    }

    fn technical_factor(
        &self,
        ind: &IndicatorSet,
        ctx: &MarketContext,
        notes: &mut Vec<String>,
    ) -> f64 {
        let mut factor: f64 = 0.0;

        if ind.rsi < 10.0 || ind.rsi > 90.0 {
            factor += 0.3;
            notes.push(format!("Extreme RSI {:.1}", ind.rsi));
        }
        if ind.macd.histogram.abs() < ind.price * self.config.macd_near_cross_pct {
            factor += 0.2;
            notes.push("MACD near crossover".to_string());
        }
        let bands = &ind.bollinger;
        if bands.middle != 0.0 && (bands.upper - bands.lower) / bands.middle < 0.02 {
            factor += 0.3;
            notes.push("Bollinger squeeze".to_string());
        }
        if ind.price > bands.upper || ind.price < bands.lower {
            factor += 0.2;
            notes.push("Price outside Bollinger bands".to_string());
        }
        if ctx.short.direction == TrendDirection::Sideways {
            factor += 0.2;
        }

        factor.min(1.0)
    }

    fn prediction_factor(
        &self,
        prediction: Option<&ExternalPrediction>,
        notes: &mut Vec<String>,
    ) -> Result<f64, RiskError> {
        let Some(prediction) = prediction else {
            notes.push("No prediction available".to_string());
            return Ok(0.7);
        };
        let confidence = prediction.confidence;
        if !confidence.is_finite() {
            return Err(RiskError::NonFinite("prediction confidence"));
        }
        Ok(if confidence < 0.5 {
            0.8
        } else if confidence < 0.6 {
            0.6
        } else if confidence < 0.7 {
            0.4
        } else if confidence < 0.8 {
            0.2
        } else {
            0.1
        })
    }

    fn exposure_factor(
        &self,
        input: &RiskInput<'_>,
        notes: &mut Vec<String>,
    ) -> Result<f64, RiskError> {
        let Some(position) = input.position else {
            return Ok(0.0);
        };
        let price =
            Decimal::from_f64(input.indicators.price).ok_or(RiskError::NonFinite("price"))?;

        let mut factor: f64 = 0.0;

        let held = position.held_hours(input.now);
        if held > self.config.max_hold_hours {
            factor += 0.3;
            notes.push(format!("Position held {:.1}h", held));
        }

        let pnl_pct = position
            .unrealized_pnl_pct(price)
            .to_f64()
            .ok_or(RiskError::NonFinite("unrealized pnl"))?;
        if pnl_pct < -5.0 {
            factor += 0.5;
            notes.push(format!("Unrealized loss {:.2}%", pnl_pct));
        } else if pnl_pct < -2.0 {
            factor += 0.3;
            notes.push(format!("Unrealized loss {:.2}%", pnl_pct));
        }

        if position.stop_hit(price) {
            factor += 0.8;
            notes.push("Price at or below stop-loss".to_string());
        }
        if position.take_profit_hit(price) {
            factor -= 0.2;
        }

        Ok(factor.clamp(0.0, 1.0))
    }

    fn frequency_factor(&self, daily_trades: u32, notes: &mut Vec<String>) -> f64 {
        let cap = self.config.max_daily_trades;
        let usage = if cap == 0 {
            1.0
        } else {
            daily_trades as f64 / cap as f64
        };
        if usage >= 1.0 {
            notes.push(format!("Daily trade cap reached ({}/{})", daily_trades, cap));
            1.0
        } else if usage >= 0.8 {
            0.6
        } else if usage >= 0.5 {
            0.3
        } else {
            0.1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentinel_core::{Action, Side};
    use sentinel_indicators::{BollingerOutput, MacdOutput};
    use sentinel_signals::{
        LongTrend, ShortTrend, TrendStrength, VolumeRegime, VolumeState, VolumeTrend,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn context(short: TrendDirection) -> MarketContext {
        MarketContext {
            short: ShortTrend {
                direction: short,
                strength: TrendStrength::Weak,
                change_pct: 0.1,
                support: 44800.0,
                resistance: 45200.0,
                volume: VolumeState {
                    regime: VolumeRegime::Medium,
                    trend: VolumeTrend::Increasing,
                    ratio: 1.0,
                },
            },
            long: LongTrend {
                direction: TrendDirection::Up,
            },
        }
    }

    /// Calm market: low ATR, wide bands, clear MACD, mid RSI.
    fn calm() -> IndicatorSet {
        let mut ind = IndicatorSet::neutral(45000.0);
        ind.rsi = 50.0;
        ind.atr_pct = 0.01;
        ind.macd = MacdOutput {
            macd: 30.0,
            signal: 10.0,
            histogram: 20.0,
        };
        ind.bollinger = BollingerOutput {
            upper: 46000.0,
            middle: 45000.0,
            lower: 44000.0,
            bandwidth: 0.044,
            percent_b: 0.5,
        };
        ind
    }

    fn prediction(confidence: f64) -> ExternalPrediction {
        ExternalPrediction::new(Action::Buy, confidence, "test", "", now())
    }

    fn position(entry: Decimal, stop: Decimal, hours_ago: i64) -> Position {
        Position {
            id: "t-1".into(),
            symbol: "BTC/USDT".into(),
            side: Side::Buy,
            entry_price: entry,
            entry_time: now() - chrono::Duration::hours(hours_ago),
            amount: dec!(0.001),
            stop_loss: stop,
            take_profit: entry * dec!(1.004),
            entry_fee: Decimal::ZERO,
        }
    }

    fn input<'a>(
        ind: &'a IndicatorSet,
        ctx: &'a MarketContext,
        prediction: Option<&'a ExternalPrediction>,
        position: Option<&'a Position>,
        daily_trades: u32,
    ) -> RiskInput<'a> {
        RiskInput {
            indicators: ind,
            context: ctx,
            prediction,
            position,
            daily_trades,
            now: now(),
        }
    }

    #[test]
    fn test_calm_market_is_low_risk() {
        let assessor = RiskAssessor::default();
        let ind = calm();
        let ctx = context(TrendDirection::Up);
        let pred = prediction(0.85);

        let a = assessor.assess(&input(&ind, &ctx, Some(&pred), None, 0));
        // 0.2*0.25 + 0 + 0.1*0.2 + 0 + 0.1*0.1
        assert!((a.score - 0.08).abs() < 1e-10);
        assert_eq!(a.level, RiskLevel::Low);
        assert_eq!(a.position_multiplier, dec!(1.2));
        assert_eq!(a.recommended_position_size, dec!(0.0012));
        assert_eq!(a.stop_loss_distance, dec!(1.5));
        assert_eq!(a.take_profit_distance, dec!(0.52));
    }

    #[test]
    fn test_multiplier_never_exceeds_max() {
        let config = RiskConfig {
            max_multiplier: dec!(1.0),
            max_position_size: dec!(0.0005),
            ..Default::default()
        };
        let assessor = RiskAssessor::new(config);
        let ind = calm();
        let ctx = context(TrendDirection::Up);

        let a = assessor.assess(&input(&ind, &ctx, None, None, 0));
        assert_eq!(a.position_multiplier, dec!(1.0));
        assert_eq!(a.recommended_position_size, dec!(0.0005));
    }

    #[test]
    fn test_stressed_market_is_high_risk() {
        let assessor = RiskAssessor::default();
        let mut ind = calm();
        ind.atr_pct = 0.06;
        ind.rsi = 95.0;
        ind.macd = MacdOutput::default();
        ind.bollinger = BollingerOutput::flat(44000.0);
        let ctx = context(TrendDirection::Sideways);
        let pos = position(dec!(48000), dec!(47520), 30);

        let a = assessor.assess(&input(&ind, &ctx, Some(&prediction(0.3)), Some(&pos), 10));
        assert_eq!(a.level, RiskLevel::High);
        assert!(a.score <= 1.0);
        assert_eq!(a.position_multiplier, dec!(0.2));
        assert_eq!(a.stop_loss_distance, dec!(0.5));
        assert_eq!(a.take_profit_distance, dec!(0.28));
        assert!(a.notes.iter().any(|n| n.contains("stop-loss")));
    }

    #[test]
    fn test_prediction_tiers() {
        let assessor = RiskAssessor::default();
        let mut notes = Vec::new();
        let tiers = [(0.4, 0.8), (0.55, 0.6), (0.65, 0.4), (0.75, 0.2), (0.8, 0.1)];
        for (confidence, expected) in tiers {
            let p = prediction(confidence);
            let factor = assessor.prediction_factor(Some(&p), &mut notes).unwrap();
            assert!((factor - expected).abs() < 1e-10, "confidence {}", confidence);
        }
        assert_eq!(assessor.prediction_factor(None, &mut notes).unwrap(), 0.7);
    }

    #[test]
    fn test_frequency_tiers() {
        let assessor = RiskAssessor::default();
        let mut notes = Vec::new();
        assert_eq!(assessor.frequency_factor(0, &mut notes), 0.1);
        assert_eq!(assessor.frequency_factor(5, &mut notes), 0.3);
        assert_eq!(assessor.frequency_factor(8, &mut notes), 0.6);
        assert_eq!(assessor.frequency_factor(10, &mut notes), 1.0);
        assert_eq!(assessor.frequency_factor(12, &mut notes), 1.0);
    }

    #[test]
    fn test_exposure_factor() {
        let assessor = RiskAssessor::default();
        let ind = calm(); // price 45000
        let ctx = context(TrendDirection::Up);
        let mut notes = Vec::new();

        // In profit past take-profit: clamped at zero
        let pos = position(dec!(44000), dec!(43560), 1);
        let i = input(&ind, &ctx, None, Some(&pos), 0);
        assert_eq!(assessor.exposure_factor(&i, &mut notes).unwrap(), 0.0);

        // Held 30h, down 2.17%
        let pos = position(dec!(46000), dec!(44000), 30);
        let i = input(&ind, &ctx, None, Some(&pos), 0);
        assert!((assessor.exposure_factor(&i, &mut notes).unwrap() - 0.6).abs() < 1e-10);

        // Stop breached caps at one
        let pos = position(dec!(48000), dec!(47520), 1);
        let i = input(&ind, &ctx, None, Some(&pos), 0);
        assert_eq!(assessor.exposure_factor(&i, &mut notes).unwrap(), 1.0);
    }

    #[test]
    fn test_score_on_medium_boundary_is_medium() {
        let assessor = RiskAssessor::default();
        let mut ind = calm();
        ind.atr_pct = 0.06;
        let ctx = context(TrendDirection::Up);

        // 0.8 volatility, 0 technical, 0.7 without prediction, 0 exposure, 0.6 at 8/10 trades
        let a = assessor.assess(&input(&ind, &ctx, None, None, 8));
        assert_eq!(a.factors.volatility, 0.8);
        assert_eq!(a.factors.technical, 0.0);
        assert_eq!(a.factors.frequency, 0.6);
        assert_eq!(a.score, 0.4);
        assert_eq!(a.level, RiskLevel::Medium);
        assert_eq!(a.position_multiplier, dec!(0.8));
        assert_eq!(a.stop_loss_distance, dec!(1.0));
        assert_eq!(a.take_profit_distance, dec!(0.4));
    }

    #[test]
    fn test_score_on_high_boundary_is_high() {
        let assessor = RiskAssessor::default();
        let mut ind = calm();
        ind.atr_pct = 0.04;
        ind.rsi = 5.0;
        ind.macd = MacdOutput::default();
        ind.bollinger = BollingerOutput::flat(44000.0);
        let ctx = context(TrendDirection::Up);
        // Stop just touched one hour in, loss under 1%
        let pos = position(dec!(45450), dec!(45000), 1);

        // 0.6 volatility, 1.0 technical, 0.7 without prediction, 0.8 exposure, 0.1 frequency
        let a = assessor.assess(&input(&ind, &ctx, None, Some(&pos), 0));
        assert_eq!(a.factors.volatility, 0.6);
        assert_eq!(a.factors.technical, 1.0);
        assert_eq!(a.factors.exposure, 0.8);
        assert_eq!(a.score, 0.7);
        assert_eq!(a.level, RiskLevel::High);
        assert_eq!(a.position_multiplier, dec!(0.2));
        assert_eq!(a.stop_loss_distance, dec!(0.5));
        assert_eq!(a.take_profit_distance, dec!(0.28));
    }

    #[test]
    fn test_score_just_below_boundaries() {
        let assessor = RiskAssessor::default();
        let ind = calm();
        let ctx = context(TrendDirection::Sideways);

        // 0.05 + 0.04 + 0.14 + 0 + 0.06
        let a = assessor.assess(&input(&ind, &ctx, None, None, 8));
        assert!((a.score - 0.29).abs() < 1e-10);
        assert_eq!(a.level, RiskLevel::Low);
        assert_eq!(a.position_multiplier, dec!(1.2));

        // A spent daily cap crosses 0.3 into the next size bucket
        let a = assessor.assess(&input(&ind, &ctx, None, None, 10));
        assert!((a.score - 0.33).abs() < 1e-10);
        assert_eq!(a.level, RiskLevel::Low);
        assert_eq!(a.position_multiplier, dec!(0.8));
        assert_eq!(a.stop_loss_distance, dec!(1.0));
    }

    #[test]
    fn test_score_rises_with_each_factor() {
        let assessor = RiskAssessor::default();
        let ctx = context(TrendDirection::Up);
        let base = assessor.assess(&input(&calm(), &ctx, Some(&prediction(0.9)), None, 0));

        let mut volatile = calm();
        volatile.atr_pct = 0.04;
        let stressed = [
            assessor.assess(&input(&volatile, &ctx, Some(&prediction(0.9)), None, 0)),
            assessor.assess(&input(&calm(), &context(TrendDirection::Sideways), Some(&prediction(0.9)), None, 0)),
            assessor.assess(&input(&calm(), &ctx, Some(&prediction(0.3)), None, 0)),
            assessor.assess(&input(&calm(), &ctx, Some(&prediction(0.9)), Some(&position(dec!(48000), dec!(47520), 30)), 0)),
            assessor.assess(&input(&calm(), &ctx, Some(&prediction(0.9)), None, 9)),
        ];
        for a in stressed {
            assert!(a.score > base.score, "{:?}", a.factors);
            assert!((0.0..=1.0).contains(&a.score));
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.39), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.7), RiskLevel::High);
    }

    #[test]
    fn test_non_finite_input_is_fail_safe() {
        let assessor = RiskAssessor::default();
        let mut ind = calm();
        ind.atr_pct = f64::NAN;
        let ctx = context(TrendDirection::Up);

        let i = input(&ind, &ctx, None, None, 0);
        assert!(matches!(assessor.try_assess(&i), Err(RiskError::NonFinite(_))));

        let a = assessor.assess(&i);
        assert_eq!(a.level, RiskLevel::High);
        assert_eq!(a.score, 1.0);
        assert_eq!(a.recommended_position_size, Decimal::ZERO);
        assert!(a.notes[0].starts_with("Fail-safe"));
    }

    #[test]
    fn test_exit_levels() {
        let assessor = RiskAssessor::default();
        let ind = calm();
        let ctx = context(TrendDirection::Up);
        let mut a = assessor.assess(&input(&ind, &ctx, Some(&prediction(0.85)), None, 0));
        a.stop_loss_distance = dec!(1.0);
        a.take_profit_distance = dec!(0.4);

        let (stop, take) = a.exit_levels(dec!(45000));
        assert_eq!(stop, dec!(44550));
        assert_eq!(take, dec!(45180));
    }

    #[test]
    fn test_config_validation() {
        assert!(RiskConfig::default().validate().is_ok());
        let config = RiskConfig {
            max_daily_trades: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = RiskConfig {
            trade_amount: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
