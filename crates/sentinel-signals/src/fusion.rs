//! Signal fusion.
//!
//! Four indicator votes (RSI, MACD, MA ordering, Stochastic) are combined into
//! one `CompositeSignal`. The long-horizon trend picks the mode: trending
//! markets require a pullback to EMA20 with aligned RSI, sideways markets
//! trade RSI extremes near EMA20.

use sentinel_core::{Action, TradingError};
use sentinel_indicators::IndicatorSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::trend::{MarketContext, TrendDirection, VolumeRegime};

/// Fusion mode, selected per cycle by the long-horizon trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalMode {
    Trending,
    Sideways,
}

/// Individual indicator votes: +1 buy, -1 sell, 0 neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub rsi: i8,
    pub macd: i8,
    pub ma: i8,
    pub stochastic: i8,
}

impl Votes {
    pub const COUNT: usize = 4;

    fn all(&self) -> [i8; 4] {
        [self.rsi, self.macd, self.ma, self.stochastic]
    }

    pub fn buys(&self) -> usize {
        self.all().iter().filter(|v| **v > 0).count()
    }

    pub fn sells(&self) -> usize {
        self.all().iter().filter(|v| **v < 0).count()
    }

    pub fn buy_ratio(&self) -> f64 {
        self.buys() as f64 / Self::COUNT as f64
    }

    pub fn sell_ratio(&self) -> f64 {
        self.sells() as f64 / Self::COUNT as f64
    }
}

/// Output of fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSignal {
    pub action: Action,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Ordered explanation trail
    pub reasons: Vec<String>,
    pub mode: SignalMode,
    pub votes: Votes,
    pub buy_ratio: f64,
    pub sell_ratio: f64,
    /// Entry is only valid near EMA20
    pub requires_pullback: bool,
    /// Price is within the mode's EMA20 tolerance
    pub pullback: bool,
}

impl CompositeSignal {
    /// Reasons joined into one line.
    pub fn reasoning(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Fusion thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    /// Minimum aligned vote ratio in trending mode
    pub trend_vote_ratio: f64,
    /// Max |price - EMA20| / EMA20 in trending mode
    pub trend_pullback_tolerance: f64,
    /// RSI must be below this for longs in an uptrend
    pub trend_rsi_long_max: f64,
    /// RSI must be above this for shorts in a downtrend
    pub trend_rsi_short_min: f64,
    /// Confidence = ratio * scale
    pub trend_confidence_scale: f64,
    /// Added when the volume regime is HIGH
    pub volume_bonus: f64,
    /// Max |price - EMA20| / EMA20 in sideways mode
    pub sideways_proximity: f64,
    pub sideways_rsi_buy: f64,
    pub sideways_rsi_sell: f64,
    pub sideways_base_confidence: f64,
    pub sideways_bonus: f64,
    pub sideways_max_confidence: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,
            trend_vote_ratio: 0.6,
            trend_pullback_tolerance: 0.002,
            trend_rsi_long_max: 40.0,
            trend_rsi_short_min: 60.0,
            trend_confidence_scale: 0.8,
            volume_bonus: 0.1,
            sideways_proximity: 0.001,
            sideways_rsi_buy: 35.0,
            sideways_rsi_sell: 65.0,
            sideways_base_confidence: 0.6,
            sideways_bonus: 0.1,
            sideways_max_confidence: 0.8,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), TradingError> {
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(TradingError::Config(
                "RSI oversold must be below overbought, both within 0-100".into(),
            ));
        }
        if self.stoch_oversold >= self.stoch_overbought {
            return Err(TradingError::Config(
                "Stochastic oversold must be below overbought".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.trend_vote_ratio) {
            return Err(TradingError::Config("Trend vote ratio must be within 0-1".into()));
        }
        if self.trend_pullback_tolerance <= 0.0 || self.sideways_proximity <= 0.0 {
            return Err(TradingError::Config("EMA20 tolerances must be positive".into()));
        }
        if self.sideways_max_confidence > 1.0 || self.sideways_base_confidence > self.sideways_max_confidence {
            return Err(TradingError::Config(
                "Sideways base confidence must not exceed the cap, cap at most 1".into(),
            ));
        }
        Ok(())
    }
}

/// Combines indicator votes and trend context into a composite signal.
#[derive(Debug, Clone, Default)]
pub struct SignalFusion {
    config: FusionConfig,
}

impl SignalFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Cast the four indicator votes.
    pub fn votes(&self, ind: &IndicatorSet) -> Votes {
        let c = &self.config;

        let rsi = if ind.rsi < c.rsi_oversold {
            1
        } else if ind.rsi > c.rsi_overbought {
            -1
        } else {
            0
        };

        let macd = if ind.macd.histogram > 0.0 && ind.macd.macd > ind.macd.signal {
            1
        } else if ind.macd.histogram < 0.0 && ind.macd.macd < ind.macd.signal {
            -1
        } else {
            0
        };

        let ma = if ind.price > ind.sma20 && ind.sma20 > ind.sma50 {
            1
        } else if ind.price < ind.sma20 && ind.sma20 < ind.sma50 {
            -1
        } else {
            0
        };

        let k = ind.stochastic.k;
        let d = ind.stochastic.d;
        let stochastic = if k < c.stoch_oversold && d < c.stoch_oversold {
            1
        } else if k > c.stoch_overbought && d > c.stoch_overbought {
            -1
        } else {
            0
        };

        Votes {
            rsi,
            macd,
            ma,
            stochastic,
        }
    }

    pub fn fuse(&self, ind: &IndicatorSet, ctx: &MarketContext) -> CompositeSignal {
        let votes = self.votes(ind);
        let signal = match ctx.long.direction {
            TrendDirection::Sideways => self.sideways(ind, ctx, votes),
            direction => self.trending(ind, ctx, votes, direction),
        };

        debug!(
            action = %signal.action,
            confidence = signal.confidence,
            mode = ?signal.mode,
            buy_ratio = signal.buy_ratio,
            sell_ratio = signal.sell_ratio,
            "Fused signal"
        );

        signal
    }

    fn trending(
        &self,
        ind: &IndicatorSet,
        ctx: &MarketContext,
        votes: Votes,
        direction: TrendDirection,
    ) -> CompositeSignal {
        let c = &self.config;
        let distance = ind.ema20_distance();
        let pullback = distance <= c.trend_pullback_tolerance;
        let high_volume = ctx.short.volume.regime == VolumeRegime::High;

        let mut reasons = vec![
            format!("Long trend {} (trending mode)", direction),
            format!(
                "Votes buy {}/4 sell {}/4",
                votes.buys(),
                votes.sells()
            ),
        ];

        let (action, ratio, rsi_aligned) = if direction == TrendDirection::Up {
            (Action::Buy, votes.buy_ratio(), ind.rsi < c.trend_rsi_long_max)
        } else {
            (Action::Sell, votes.sell_ratio(), ind.rsi > c.trend_rsi_short_min)
        };

        let mut signal = CompositeSignal {
            action: Action::Hold,
            confidence: 0.0,
            reasons: Vec::new(),
            mode: SignalMode::Trending,
            votes,
            buy_ratio: votes.buy_ratio(),
            sell_ratio: votes.sell_ratio(),
            requires_pullback: true,
            pullback,
        };

        if ratio < c.trend_vote_ratio {
            reasons.push(format!(
                "Aligned vote ratio {:.2} below {:.2}",
                ratio, c.trend_vote_ratio
            ));
        } else if !pullback {
            reasons.push(format!(
                "Waiting for EMA20 pullback ({:.3}% away)",
                distance * 100.0
            ));
        } else if !rsi_aligned {
            reasons.push(format!("RSI {:.1} not aligned with trend", ind.rsi));
        } else {
            let voided = match action {
                Action::Buy => ind.bollinger.is_overbought(ind.price),
                _ => ind.bollinger.is_oversold(ind.price),
            };
            if voided {
                reasons.push(format!(
                    "{} voided: price {:.2} already beyond Bollinger band",
                    action, ind.price
                ));
            } else {
                let mut confidence = ratio * c.trend_confidence_scale;
                reasons.push(format!(
                    "EMA20 pullback {:.3}% with RSI {:.1}",
                    distance * 100.0,
                    ind.rsi
                ));
                if high_volume {
                    confidence += c.volume_bonus;
                    reasons.push("High volume confirms".to_string());
                }
                signal.action = action;
                signal.confidence = confidence.clamp(0.0, 1.0);
            }
        }

        signal.reasons = reasons;
        signal
    }

    fn sideways(&self, ind: &IndicatorSet, ctx: &MarketContext, votes: Votes) -> CompositeSignal {
        let c = &self.config;
        let distance = ind.ema20_distance();
        let near = distance <= c.sideways_proximity;
        let high_volume = ctx.short.volume.regime == VolumeRegime::High;

        let mut reasons = vec!["Long trend SIDEWAYS (range mode)".to_string()];
        let mut action = Action::Hold;
        let mut confidence = 0.0;

        if near && ind.rsi < c.sideways_rsi_buy {
            action = Action::Buy;
            confidence = c.sideways_base_confidence;
            reasons.push(format!("RSI {:.1} oversold near EMA20", ind.rsi));
            if high_volume {
                confidence += c.sideways_bonus;
                reasons.push("High volume".to_string());
            }
            if votes.macd > 0 {
                confidence += c.sideways_bonus;
                reasons.push("MACD agrees".to_string());
            }
            if ind.price <= ind.bollinger.lower {
                confidence += c.sideways_bonus;
                reasons.push("Price at lower Bollinger band".to_string());
            }
        } else if near && ind.rsi > c.sideways_rsi_sell {
            action = Action::Sell;
            confidence = c.sideways_base_confidence;
            reasons.push(format!("RSI {:.1} overbought near EMA20", ind.rsi));
            if high_volume {
                confidence += c.sideways_bonus;
                reasons.push("High volume".to_string());
            }
            if votes.macd < 0 {
                confidence += c.sideways_bonus;
                reasons.push("MACD agrees".to_string());
            }
            if ind.price >= ind.bollinger.upper {
                confidence += c.sideways_bonus;
                reasons.push("Price at upper Bollinger band".to_string());
            }
        } else {
            reasons.push(format!(
                "Waiting for RSI extreme near EMA20 (RSI {:.1}, {:.3}% away)",
                ind.rsi,
                distance * 100.0
            ));
        }

        CompositeSignal {
            action,
            confidence: confidence.min(c.sideways_max_confidence),
            reasons,
            mode: SignalMode::Sideways,
            votes,
            buy_ratio: votes.buy_ratio(),
            sell_ratio: votes.sell_ratio(),
            requires_pullback: true,
            pullback: near,
        }
    }
}
