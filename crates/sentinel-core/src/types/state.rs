//! Versioned engine state and the position state machine.
//!
//! `EngineState` is the only mutable state the decision pipeline depends on.
//! It is passed into each evaluation, mutated only through the transition
//! methods below, and serialised as the persisted snapshot.
//!
//! ```text
//! FLAT --begin_entry--> ENTERING --confirm_entry--> OPEN
//!  ^                       |                          |
//!  +------abort_pending----+                     begin_exit
//!  |                                                  v
//!  +-------------confirm_exit----------------------EXITING
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Fill, OrderRequest, Position, Side};
use crate::error::StateError;

/// Position lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    #[default]
    Flat,
    Entering,
    Open,
    Exiting,
}

/// Trades executed on the current UTC calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub date: Option<NaiveDate>,
    pub trades: u32,
}

impl DailyCounter {
    /// Reset the count if `date` is a new day. Returns true on rollover.
    pub fn roll(&mut self, date: NaiveDate) -> bool {
        if self.date == Some(date) {
            return false;
        }
        self.date = Some(date);
        self.trades = 0;
        true
    }

    fn record(&mut self, date: NaiveDate) {
        self.roll(date);
        self.trades += 1;
    }
}

/// Realized P&L over the current ISO week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPnl {
    pub iso_year: i32,
    pub iso_week: u32,
    pub realized: Decimal,
}

impl WeeklyPnl {
    /// Reset the sum if `now` falls in a different ISO week. Returns true on rollover.
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        let week = now.iso_week();
        if self.iso_year == week.year() && self.iso_week == week.week() {
            return false;
        }
        self.iso_year = week.year();
        self.iso_week = week.week();
        self.realized = Decimal::ZERO;
        true
    }
}

/// Lifetime counters over closed round trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub closed_trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub realized_pnl: Decimal,
    pub fees_paid: Decimal,
}

/// Order submitted but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub request: OrderRequest,
    /// Protective levels applied to the position once the entry fills
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub reason: String,
}

/// Immutable record of one executed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    /// Net of both fees. None for opening trades.
    pub pnl: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Explicit, versioned engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Incremented on every committed transition
    pub version: u64,
    pub phase: Phase,
    pub position: Option<Position>,
    pub pending: Option<PendingOrder>,
    pub daily: DailyCounter,
    pub weekly: WeeklyPnl,
    pub stats: TradeStats,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.phase == Phase::Flat
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Roll daily and weekly counters to the calendar position of `now`.
    pub fn roll_calendar(&mut self, now: DateTime<Utc>) -> bool {
        let daily = self.daily.roll(now.date_naive());
        let weekly = self.weekly.roll(now);
        if daily || weekly {
            self.version += 1;
        }
        daily || weekly
    }

    /// FLAT -> ENTERING.
    pub fn begin_entry(&mut self, pending: PendingOrder) -> Result<(), StateError> {
        self.expect_phase(Phase::Flat, "begin entry")?;
        if pending.request.side != Side::Buy {
            return Err(StateError::SideMismatch(pending.request.side));
        }
        self.pending = Some(pending);
        self.phase = Phase::Entering;
        self.version += 1;
        Ok(())
    }

    /// ENTERING -> OPEN. Opens the position from the fill.
    pub fn confirm_entry(&mut self, fill: &Fill) -> Result<TradeRecord, StateError> {
        self.expect_phase(Phase::Entering, "confirm entry")?;
        if fill.side != Side::Buy {
            return Err(StateError::SideMismatch(fill.side));
        }
        let pending = self
            .pending
            .take()
            .ok_or(StateError::InvalidTransition {
                phase: self.phase,
                action: "confirm entry",
            })?;

        self.position = Some(Position {
            id: fill.id.clone(),
            symbol: pending.request.symbol.clone(),
            side: Side::Buy,
            entry_price: fill.price,
            entry_time: fill.timestamp,
            amount: fill.amount,
            stop_loss: pending.stop_loss,
            take_profit: pending.take_profit,
            entry_fee: fill.fee,
        });
        self.daily.record(fill.timestamp.date_naive());
        self.stats.fees_paid += fill.fee;
        self.phase = Phase::Open;
        self.version += 1;

        Ok(TradeRecord {
            id: fill.id.clone(),
            symbol: pending.request.symbol,
            side: Side::Buy,
            amount: fill.amount,
            price: fill.price,
            fee: fill.fee,
            pnl: None,
            timestamp: fill.timestamp,
            reason: pending.reason,
        })
    }

    /// OPEN -> EXITING.
    pub fn begin_exit(&mut self, pending: PendingOrder) -> Result<(), StateError> {
        self.expect_phase(Phase::Open, "begin exit")?;
        if pending.request.side != Side::Sell {
            return Err(StateError::SideMismatch(pending.request.side));
        }
        self.pending = Some(pending);
        self.phase = Phase::Exiting;
        self.version += 1;
        Ok(())
    }

    /// EXITING -> FLAT. Realizes P&L net of entry and exit fees.
    pub fn confirm_exit(&mut self, fill: &Fill) -> Result<TradeRecord, StateError> {
        self.expect_phase(Phase::Exiting, "confirm exit")?;
        if fill.side != Side::Sell {
            return Err(StateError::SideMismatch(fill.side));
        }
        let invalid = StateError::InvalidTransition {
            phase: self.phase,
            action: "confirm exit",
        };
        let pending = self.pending.take().ok_or(invalid.clone())?;
        let position = self.position.take().ok_or(invalid)?;

        let pnl = (fill.price - position.entry_price) * fill.amount - position.entry_fee - fill.fee;

        self.weekly.roll(fill.timestamp);
        self.weekly.realized += pnl;
        self.daily.record(fill.timestamp.date_naive());
        self.stats.closed_trades += 1;
        if pnl > Decimal::ZERO {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        self.stats.realized_pnl += pnl;
        self.stats.fees_paid += fill.fee;
        self.phase = Phase::Flat;
        self.version += 1;

        Ok(TradeRecord {
            id: fill.id.clone(),
            symbol: pending.request.symbol,
            side: Side::Sell,
            amount: fill.amount,
            price: fill.price,
            fee: fill.fee,
            pnl: Some(pnl),
            timestamp: fill.timestamp,
            reason: pending.reason,
        })
    }

    /// Failed fill: ENTERING -> FLAT or EXITING -> OPEN with the position unchanged.
    pub fn abort_pending(&mut self) -> Result<(), StateError> {
        self.phase = match self.phase {
            Phase::Entering => Phase::Flat,
            Phase::Exiting => Phase::Open,
            phase => {
                return Err(StateError::InvalidTransition {
                    phase,
                    action: "abort pending order",
                })
            }
        };
        self.pending = None;
        self.version += 1;
        Ok(())
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), StateError> {
        if self.phase != expected {
            return Err(StateError::InvalidTransition {
                phase: self.phase,
                action,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn pending(side: Side, price: Decimal, now: DateTime<Utc>) -> PendingOrder {
        PendingOrder {
            request: OrderRequest::market("o", "BTC/USDT", side, dec!(0.1), price, now),
            stop_loss: dec!(44550),
            take_profit: dec!(45180),
            reason: "test".into(),
        }
    }

    fn fill(id: &str, side: Side, price: Decimal, fee: Decimal, now: DateTime<Utc>) -> Fill {
        Fill {
            id: id.into(),
            side,
            amount: dec!(0.1),
            price,
            fee,
            timestamp: now,
        }
    }

    #[test]
    fn test_full_round_trip() {
        let mut state = EngineState::new();
        let now = at(15, 10);

        state.begin_entry(pending(Side::Buy, dec!(45000), now)).unwrap();
        assert_eq!(state.phase, Phase::Entering);

        let record = state
            .confirm_entry(&fill("t1", Side::Buy, dec!(45000), dec!(4.5), now))
            .unwrap();
        assert_eq!(record.pnl, None);
        assert_eq!(state.phase, Phase::Open);
        let position = state.position().unwrap();
        assert_eq!(position.stop_loss, dec!(44550));
        assert_eq!(position.entry_fee, dec!(4.5));
        assert_eq!(state.daily.trades, 1);

        state.begin_exit(pending(Side::Sell, dec!(46000), now)).unwrap();
        let record = state
            .confirm_exit(&fill("t2", Side::Sell, dec!(46000), dec!(4.6), at(15, 11)))
            .unwrap();
        // 0.1 * 1000 - 4.5 - 4.6
        assert_eq!(record.pnl, Some(dec!(90.9)));
        assert!(state.is_flat());
        assert!(state.position().is_none());
        assert_eq!(state.daily.trades, 2);
        assert_eq!(state.stats.wins, 1);
        assert_eq!(state.weekly.realized, dec!(90.9));
        assert_eq!(state.version, 4);
    }

    #[test]
    fn test_round_trip_at_same_price_costs_two_fees() {
        let f = dec!(0.001);
        let notional = dec!(4500);
        let fee = notional * f;
        let mut state = EngineState::new();
        let now = at(15, 10);

        state.begin_entry(pending(Side::Buy, dec!(45000), now)).unwrap();
        state
            .confirm_entry(&fill("t1", Side::Buy, dec!(45000), fee, now))
            .unwrap();
        state.begin_exit(pending(Side::Sell, dec!(45000), now)).unwrap();
        let record = state
            .confirm_exit(&fill("t2", Side::Sell, dec!(45000), fee, now))
            .unwrap();

        assert_eq!(record.pnl, Some(dec!(-2) * f * notional));
        assert_eq!(state.stats.losses, 1);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut state = EngineState::new();
        let now = at(15, 10);

        assert!(state.begin_exit(pending(Side::Sell, dec!(1), now)).is_err());
        assert!(state.abort_pending().is_err());
        assert_eq!(
            state.begin_entry(pending(Side::Sell, dec!(1), now)),
            Err(StateError::SideMismatch(Side::Sell))
        );

        state.begin_entry(pending(Side::Buy, dec!(45000), now)).unwrap();
        // No second entry while one is pending
        assert!(state.begin_entry(pending(Side::Buy, dec!(45000), now)).is_err());
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_abort_restores_previous_phase() {
        let mut state = EngineState::new();
        let now = at(15, 10);

        state.begin_entry(pending(Side::Buy, dec!(45000), now)).unwrap();
        state.abort_pending().unwrap();
        assert!(state.is_flat());
        assert!(state.position.is_none());
        assert!(state.pending.is_none());

        state.begin_entry(pending(Side::Buy, dec!(45000), now)).unwrap();
        state
            .confirm_entry(&fill("t1", Side::Buy, dec!(45000), dec!(4.5), now))
            .unwrap();
        let before = state.position.clone();
        state.begin_exit(pending(Side::Sell, dec!(44000), now)).unwrap();
        state.abort_pending().unwrap();
        assert_eq!(state.phase, Phase::Open);
        assert_eq!(state.position, before);
    }

    #[test]
    fn test_calendar_rollover() {
        let mut state = EngineState::new();
        assert!(state.roll_calendar(at(15, 10)));
        state.daily.trades = 4;
        state.weekly.realized = dec!(-50);

        // Same day: nothing resets
        assert!(!state.roll_calendar(at(15, 23)));
        assert_eq!(state.daily.trades, 4);

        // Next day, same ISO week (Mon 15th -> Tue 16th)
        assert!(state.roll_calendar(at(16, 0)));
        assert_eq!(state.daily.trades, 0);
        assert_eq!(state.weekly.realized, dec!(-50));

        // Following Monday starts a new week
        assert!(state.roll_calendar(at(22, 0)));
        assert_eq!(state.weekly.realized, Decimal::ZERO);
    }

    #[test]
    fn test_state_snapshot_serde() {
        let mut state = EngineState::new();
        state.roll_calendar(at(15, 10));
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"FLAT\""));
        let restored: EngineState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
