//! Position state machine decisions.
//!
//! [`DecisionEngine::evaluate`] is a pure function of the explicit
//! [`EngineState`] and the cycle's analysis. Guardrails are checked in
//! priority order and the first match wins:
//!
//! 1. weekly circuit breaker (absolute, also blocks exits)
//! 2. protective exits while OPEN (stop-loss, take-profit)
//! 3. daily trade cap, HIGH risk, trend-only mode, pullback entry condition
//!    (entries only)
//! 4. confirmation by the prediction, or by technical confidence without one

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sentinel_core::{Action, EngineState, ExternalPrediction, Phase};
use sentinel_indicators::IndicatorSet;
use sentinel_risk::{PositionSizer, RiskAssessment, RiskLevel};
use sentinel_signals::{CompositeSignal, MarketContext, TrendDirection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EngineConfig, StrategyMode};

/// Everything a single evaluation looks at besides the engine state.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub indicators: &'a IndicatorSet,
    pub context: &'a MarketContext,
    pub signal: &'a CompositeSignal,
    pub prediction: Option<&'a ExternalPrediction>,
    pub risk: &'a RiskAssessment,
    /// Account value in quote currency
    pub balance: Decimal,
    /// Quote currency available for entries
    pub cash: Decimal,
    pub now: DateTime<Utc>,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Base-asset amount; zero for HOLD
    pub amount: Decimal,
    pub price: Decimal,
    /// Protective levels for a BUY
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn hold(price: Decimal, reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            action: Action::Hold,
            amount: Decimal::ZERO,
            price,
            stop_loss: None,
            take_profit: None,
            confidence: 0.0,
            reasons: vec![reason.into()],
            timestamp,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action.is_hold()
    }

    /// Reasoning trail joined into one line.
    pub fn reasoning(&self) -> String {
        self.reasons.join(" | ")
    }
}

/// Guardrailed BUY/SELL/HOLD decisions over [`EngineState`].
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
    sizer: PositionSizer,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig, sizer: PositionSizer) -> Self {
        Self { config, sizer }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide for this cycle. The caller rolls the calendar counters of
    /// `state` to `input.now` beforehand.
    pub fn evaluate(&self, state: &EngineState, input: &DecisionInput<'_>) -> Decision {
        let now = input.now;
        let price = match Decimal::from_f64(input.indicators.price) {
            Some(p) if p > Decimal::ZERO => p,
            _ => {
                return Decision::hold(
                    Decimal::ZERO,
                    format!("No valid price ({})", input.indicators.price),
                    now,
                )
            }
        };

        if let Some(reason) = self.weekly_breaker(state, input.balance) {
            info!(reason = %reason, "Weekly circuit breaker engaged");
            return Decision::hold(price, reason, now);
        }

        let decision = match state.phase {
            Phase::Entering | Phase::Exiting => {
                Decision::hold(price, format!("Order pending in phase {:?}", state.phase), now)
            }
            Phase::Open => self.evaluate_open(state, input, price),
            Phase::Flat => self.evaluate_flat(state, input, price),
        };

        debug!(
            action = %decision.action,
            phase = ?state.phase,
            confidence = decision.confidence,
            reasoning = %decision.reasoning(),
            "Decision evaluated"
        );
        decision
    }

    fn weekly_breaker(&self, state: &EngineState, balance: Decimal) -> Option<String> {
        if balance <= Decimal::ZERO {
            return None;
        }
        let weekly_pct = state.weekly.realized / balance * Decimal::ONE_HUNDRED;
        (weekly_pct <= -self.config.weekly_loss_limit_pct).then(|| {
            format!(
                "Weekly loss guardrail: {:.2}% of balance this week (limit -{}%)",
                weekly_pct, self.config.weekly_loss_limit_pct
            )
        })
    }

    fn evaluate_open(&self, state: &EngineState, input: &DecisionInput<'_>, price: Decimal) -> Decision {
        let now = input.now;
        let Some(position) = state.position() else {
            return Decision::hold(price, "Phase OPEN without a position", now);
        };

        let sell = |confidence: f64, reasons: Vec<String>| Decision {
            action: Action::Sell,
            amount: position.amount,
            price,
            stop_loss: None,
            take_profit: None,
            confidence,
            reasons,
            timestamp: now,
        };

        if position.stop_hit(price) {
            return sell(
                1.0,
                vec![format!(
                    "Stop-loss hit: price {} <= stop {}",
                    price.round_dp(2),
                    position.stop_loss.round_dp(2)
                )],
            );
        }

        let gain_pct = position.unrealized_pnl_pct(price);
        if gain_pct >= self.config.take_profit_pct {
            return sell(
                1.0,
                vec![format!(
                    "Take-profit: gain {:.3}% >= {}%",
                    gain_pct, self.config.take_profit_pct
                )],
            );
        }
        if position.take_profit_hit(price) {
            return sell(
                1.0,
                vec![format!(
                    "Take-profit level reached: price {} >= {}",
                    price.round_dp(2),
                    position.take_profit.round_dp(2)
                )],
            );
        }

        let signal = input.signal;
        if signal.action == Action::Sell {
            return match self.confirm(Action::Sell, signal, input.prediction) {
                Ok(confirmation) => {
                    let mut reasons = vec![format!("Composite SELL ({:.2})", signal.confidence)];
                    reasons.extend(signal.reasons.iter().cloned());
                    reasons.push(confirmation);
                    sell(signal.confidence, reasons)
                }
                Err(rejection) => Decision::hold(price, rejection, now),
            };
        }

        Decision::hold(
            price,
            format!("Holding position: unrealized {:.3}%", gain_pct),
            now,
        )
    }

    fn evaluate_flat(&self, state: &EngineState, input: &DecisionInput<'_>, price: Decimal) -> Decision {
        let now = input.now;
        let signal = input.signal;

        if state.daily.trades >= self.config.max_daily_trades {
            return Decision::hold(
                price,
                format!(
                    "Daily trade cap reached ({}/{})",
                    state.daily.trades, self.config.max_daily_trades
                ),
                now,
            );
        }

        if input.risk.level == RiskLevel::High {
            let mut hold = Decision::hold(
                price,
                format!("Risk level HIGH (score {:.2})", input.risk.score),
                now,
            );
            hold.reasons.extend(input.risk.notes.iter().cloned());
            return hold;
        }

        if self.config.strategy_mode == StrategyMode::TrendOnly
            && input.context.long.direction == TrendDirection::Sideways
        {
            return Decision::hold(price, "Trend-only mode: long trend is SIDEWAYS", now);
        }

        if signal.action != Action::Buy {
            let mut hold = Decision::hold(price, format!("Signal {}", signal.action), now);
            hold.reasons.extend(signal.reasons.iter().cloned());
            return hold;
        }

        if signal.requires_pullback && !signal.pullback {
            return Decision::hold(
                price,
                format!(
                    "Entry condition unmet: no pullback to EMA20 ({:.3}% away)",
                    input.indicators.ema20_distance() * 100.0
                ),
                now,
            );
        }

        let confirmation = match self.confirm(Action::Buy, signal, input.prediction) {
            Ok(confirmation) => confirmation,
            Err(rejection) => return Decision::hold(price, rejection, now),
        };

        let (stop_loss, take_profit) = input.risk.exit_levels(price);
        let sized = self.sizer.calculate(input.risk, input.balance, price, stop_loss);
        let affordable = input.cash / (price * (Decimal::ONE + self.config.fee_rate));
        let amount = sized.min(affordable).round_dp(8);
        if amount <= Decimal::ZERO {
            return Decision::hold(price, format!("Position size is zero (sized {})", sized), now);
        }

        let mut reasons = vec![format!("Composite BUY ({:.2})", signal.confidence)];
        reasons.extend(signal.reasons.iter().cloned());
        reasons.push(confirmation);
        reasons.push(format!(
            "Risk {:?} (score {:.2}, x{})",
            input.risk.level, input.risk.score, input.risk.position_multiplier
        ));

        Decision {
            action: Action::Buy,
            amount,
            price,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            confidence: signal.confidence,
            reasons,
            timestamp: now,
        }
    }

    fn confirm(
        &self,
        action: Action,
        signal: &CompositeSignal,
        prediction: Option<&ExternalPrediction>,
    ) -> Result<String, String> {
        match prediction {
            Some(p) if p.confirms(action, self.config.prediction_threshold) => Ok(format!(
                "Confirmed by {} {} ({:.2})",
                p.provider, p.signal, p.confidence
            )),
            Some(p) => Err(format!(
                "Not confirmed by {}: {} ({:.2}, needs {} > {})",
                p.provider, p.signal, p.confidence, action, self.config.prediction_threshold
            )),
            None if signal.confidence > self.config.technical_threshold => Ok(format!(
                "Technical confidence {:.2} > {}",
                signal.confidence, self.config.technical_threshold
            )),
            None => Err(format!(
                "Technical confidence {:.2} <= {} without a prediction",
                signal.confidence, self.config.technical_threshold
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use sentinel_core::{Fill, OrderRequest, PendingOrder, Position, Side};
    use sentinel_risk::{RiskConfig, RiskFactors};
    use sentinel_signals::{
        LongTrend, ShortTrend, SignalMode, TrendStrength, VolumeRegime, VolumeState, VolumeTrend,
        Votes,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 17, 12, 0, 0).unwrap()
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(EngineConfig::default(), PositionSizer::new(&RiskConfig::default()))
    }

    fn indicators(price: f64) -> IndicatorSet {
        let mut ind = IndicatorSet::neutral(price);
        ind.ema20 = price;
        ind
    }

    fn context(long: TrendDirection) -> MarketContext {
        MarketContext {
            short: ShortTrend {
                direction: long,
                strength: TrendStrength::Weak,
                change_pct: 0.0,
                support: 44000.0,
                resistance: 46000.0,
                volume: VolumeState {
                    regime: VolumeRegime::Medium,
                    trend: VolumeTrend::Increasing,
                    ratio: 1.0,
                },
            },
            long: LongTrend { direction: long },
        }
    }

    fn signal(action: Action, confidence: f64) -> CompositeSignal {
        CompositeSignal {
            action,
            confidence,
            reasons: vec!["RSI 35.0 oversold".into()],
            mode: SignalMode::Trending,
            votes: Votes::default(),
            buy_ratio: 0.75,
            sell_ratio: 0.0,
            requires_pullback: true,
            pullback: true,
        }
    }

    fn risk(level: RiskLevel) -> RiskAssessment {
        RiskAssessment {
            level,
            score: match level {
                RiskLevel::Low => 0.2,
                RiskLevel::Medium => 0.5,
                RiskLevel::High => 0.8,
            },
            factors: RiskFactors::default(),
            position_multiplier: dec!(1.2),
            recommended_position_size: dec!(0.0012),
            stop_loss_distance: dec!(1.0),
            take_profit_distance: dec!(0.4),
            notes: vec![],
        }
    }

    struct Case {
        state: EngineState,
        indicators: IndicatorSet,
        context: MarketContext,
        signal: CompositeSignal,
        prediction: Option<ExternalPrediction>,
        risk: RiskAssessment,
        balance: Decimal,
    }

    impl Case {
        fn flat(action: Action, confidence: f64) -> Self {
            Self {
                state: EngineState::new(),
                indicators: indicators(45000.0),
                context: context(TrendDirection::Up),
                signal: signal(action, confidence),
                prediction: None,
                risk: risk(RiskLevel::Low),
                balance: dec!(10000),
            }
        }

        fn open(entry: Decimal, stop: Decimal, take_profit: Decimal, price: f64) -> Self {
            let mut case = Self::flat(Action::Hold, 0.0);
            case.indicators = indicators(price);
            case.state.phase = Phase::Open;
            case.state.position = Some(Position {
                id: "bt-000001".into(),
                symbol: "BTC/USDT".into(),
                side: Side::Buy,
                entry_price: entry,
                entry_time: now(),
                amount: dec!(0.001),
                stop_loss: stop,
                take_profit,
                entry_fee: dec!(0.045),
            });
            case
        }

        fn run(&self, engine: &DecisionEngine) -> Decision {
            engine.evaluate(
                &self.state,
                &DecisionInput {
                    indicators: &self.indicators,
                    context: &self.context,
                    signal: &self.signal,
                    prediction: self.prediction.as_ref(),
                    risk: &self.risk,
                    balance: self.balance,
                    cash: self.balance,
                    now: now(),
                },
            )
        }
    }

    #[test]
    fn test_confirmed_buy_is_sized_with_levels() {
        let decision = Case::flat(Action::Buy, 0.8).run(&engine());

        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.amount, dec!(0.0012));
        assert_eq!(decision.price, dec!(45000));
        assert_eq!(decision.stop_loss, Some(dec!(44550)));
        assert_eq!(decision.take_profit, Some(dec!(45180)));
        assert!(decision.reasoning().contains("Technical confidence"));
    }

    #[test]
    fn test_weekly_breaker_blocks_confident_buy() {
        let mut case = Case::flat(Action::Buy, 0.9);
        case.state.weekly.realized = dec!(-200);
        let decision = case.run(&engine());

        assert_eq!(decision.action, Action::Hold);
        assert!(decision.reasoning().contains("Weekly loss guardrail"));
    }

    #[test]
    fn test_weekly_breaker_boundary() {
        let mut case = Case::flat(Action::Buy, 0.9);
        case.state.weekly.realized = dec!(-150);
        assert_eq!(case.run(&engine()).action, Action::Hold);

        case.state.weekly.realized = dec!(-149);
        assert_eq!(case.run(&engine()).action, Action::Buy);
    }

    #[test]
    fn test_weekly_breaker_blocks_exits() {
        let mut case = Case::open(dec!(45000), dec!(44550), dec!(45180), 44500.0);
        case.state.weekly.realized = dec!(-300);
        assert_eq!(case.run(&engine()).action, Action::Hold);
    }

    #[test]
    fn test_stop_loss_exit_ignores_entry_guards() {
        let mut case = Case::open(dec!(45000), dec!(44550), dec!(45180), 44500.0);
        case.risk = risk(RiskLevel::High);
        case.state.daily.trades = 99;
        let decision = case.run(&engine());

        assert_eq!(decision.action, Action::Sell);
        assert_eq!(decision.amount, dec!(0.001));
        assert!(decision.reasoning().contains("Stop-loss"));
    }

    #[test]
    fn test_take_profit_exits() {
        // +0.4% unrealized
        let decision = Case::open(dec!(45000), dec!(44550), dec!(46000), 45180.0).run(&engine());
        assert_eq!(decision.action, Action::Sell);
        assert!(decision.reasoning().contains("Take-profit"));

        // Stored level below the percent target
        let decision = Case::open(dec!(45000), dec!(44550), dec!(45090), 45100.0).run(&engine());
        assert_eq!(decision.action, Action::Sell);
        assert!(decision.reasoning().contains("level reached"));

        let decision = Case::open(dec!(45000), dec!(44550), dec!(45180), 45050.0).run(&engine());
        assert_eq!(decision.action, Action::Hold);
    }

    #[test]
    fn test_composite_sell_needs_confirmation() {
        let mut case = Case::open(dec!(45000), dec!(44550), dec!(45180), 45050.0);
        case.signal = signal(Action::Sell, 0.65);
        assert_eq!(case.run(&engine()).action, Action::Hold);

        case.signal = signal(Action::Sell, 0.75);
        assert_eq!(case.run(&engine()).action, Action::Sell);

        case.prediction = Some(ExternalPrediction::new(Action::Buy, 0.9, "p", "", now()));
        assert_eq!(case.run(&engine()).action, Action::Hold);
    }

    #[test]
    fn test_no_buy_while_open_no_sell_while_flat() {
        let mut case = Case::open(dec!(45000), dec!(44550), dec!(45180), 45050.0);
        case.signal = signal(Action::Buy, 0.95);
        assert_eq!(case.run(&engine()).action, Action::Hold);

        let decision = Case::flat(Action::Sell, 0.95).run(&engine());
        assert_eq!(decision.action, Action::Hold);
    }

    #[test]
    fn test_entry_guards_in_order() {
        let engine = engine();

        let mut case = Case::flat(Action::Buy, 0.9);
        case.state.daily.trades = 10;
        case.risk = risk(RiskLevel::High);
        assert!(case.run(&engine).reasoning().contains("Daily trade cap"));

        let mut case = Case::flat(Action::Buy, 0.9);
        case.risk = risk(RiskLevel::High);
        assert!(case.run(&engine).reasoning().contains("Risk level HIGH"));

        let mut case = Case::flat(Action::Buy, 0.9);
        case.signal.pullback = false;
        assert!(case.run(&engine).reasoning().contains("no pullback"));

        let case = Case::flat(Action::Buy, 0.65);
        assert!(case.run(&engine).reasoning().contains("without a prediction"));
    }

    #[test]
    fn test_trend_only_mode_blocks_sideways_entries() {
        let config = EngineConfig {
            strategy_mode: StrategyMode::TrendOnly,
            ..Default::default()
        };
        let engine = DecisionEngine::new(config, PositionSizer::new(&RiskConfig::default()));

        let mut case = Case::flat(Action::Buy, 0.9);
        case.context = context(TrendDirection::Sideways);
        assert!(case.run(&engine).reasoning().contains("Trend-only"));

        // Adaptive mode trades the range
        assert_eq!(case.run(&self::engine()).action, Action::Buy);
    }

    #[test]
    fn test_prediction_confirmation() {
        let mut case = Case::flat(Action::Buy, 0.5);
        case.prediction = Some(ExternalPrediction::new(Action::Buy, 0.65, "technical-proxy", "", now()));
        let decision = case.run(&engine());
        assert_eq!(decision.action, Action::Buy);
        assert!(decision.reasoning().contains("Confirmed by technical-proxy"));

        case.prediction = Some(ExternalPrediction::new(Action::Buy, 0.6, "technical-proxy", "", now()));
        assert_eq!(case.run(&engine()).action, Action::Hold);
    }

    #[test]
    fn test_pending_phase_holds() {
        let mut case = Case::flat(Action::Buy, 0.9);
        case.state
            .begin_entry(PendingOrder {
                request: OrderRequest::market("o-1", "BTC/USDT", Side::Buy, dec!(0.001), dec!(45000), now()),
                stop_loss: dec!(44550),
                take_profit: dec!(45180),
                reason: String::new(),
            })
            .unwrap();
        assert_eq!(case.run(&engine()).action, Action::Hold);
    }

    #[test]
    fn test_entry_capped_by_cash() {
        let mut case = Case::flat(Action::Buy, 0.9);
        case.risk.recommended_position_size = dec!(1);
        let engine = engine();
        let decision = engine.evaluate(
            &case.state,
            &DecisionInput {
                indicators: &case.indicators,
                context: &case.context,
                signal: &case.signal,
                prediction: None,
                risk: &case.risk,
                balance: dec!(10000),
                cash: dec!(450.45),
                now: now(),
            },
        );
        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.amount, dec!(0.01));
    }

    #[test]
    fn test_position_invariant_over_cycles() {
        let engine = engine();
        let mut state = EngineState::new();
        let prices = [45000.0, 45050.0, 45200.0, 45000.0, 44400.0, 45000.0];

        for (i, &p) in prices.iter().enumerate() {
            let mut case = Case::flat(Action::Buy, 0.9);
            case.indicators = indicators(p);
            case.state = state.clone();
            let decision = case.run(&engine);

            match decision.action {
                Action::Buy => {
                    assert!(state.is_flat());
                    let price = decision.price;
                    state
                        .begin_entry(PendingOrder {
                            request: OrderRequest::market(
                                format!("bt-{:06}", i),
                                "BTC/USDT",
                                Side::Buy,
                                decision.amount,
                                price,
                                now(),
                            ),
                            stop_loss: decision.stop_loss.unwrap(),
                            take_profit: decision.take_profit.unwrap(),
                            reason: decision.reasoning(),
                        })
                        .unwrap();
                    state
                        .confirm_entry(&Fill {
                            id: format!("bt-{:06}", i),
                            side: Side::Buy,
                            amount: decision.amount,
                            price,
                            fee: Decimal::ZERO,
                            timestamp: now(),
                        })
                        .unwrap();
                }
                Action::Sell => {
                    assert_eq!(state.phase, Phase::Open);
                    state
                        .begin_exit(PendingOrder {
                            request: OrderRequest::market(
                                format!("bt-{:06}", i),
                                "BTC/USDT",
                                Side::Sell,
                                decision.amount,
                                decision.price,
                                now(),
                            ),
                            stop_loss: Decimal::ZERO,
                            take_profit: Decimal::ZERO,
                            reason: decision.reasoning(),
                        })
                        .unwrap();
                    state
                        .confirm_exit(&Fill {
                            id: format!("bt-{:06}", i),
                            side: Side::Sell,
                            amount: decision.amount,
                            price: decision.price,
                            fee: Decimal::ZERO,
                            timestamp: now(),
                        })
                        .unwrap();
                }
                Action::Hold => {}
            }
            assert!(state.position.is_some() == (state.phase == Phase::Open));
        }

        // BUY 45000, take-profit at 45200, BUY 45000, stop at 44400, BUY 45000
        assert_eq!(state.stats.closed_trades, 2);
        assert_eq!(state.phase, Phase::Open);
    }
}
