//! Position and portfolio ledger types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Fill, Side};
use crate::error::BrokerError;

/// The single open position. Long-only: entered by a BUY, closed in full by a SELL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Id of the opening trade
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    /// Quantity in base-asset units
    pub amount: Decimal,
    /// Protective stop price
    pub stop_loss: Decimal,
    /// Take-profit price
    pub take_profit: Decimal,
    /// Fee paid on entry, charged against P&L on close
    pub entry_fee: Decimal,
}

impl Position {
    /// Unrealized P&L at `price`, excluding fees.
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        match self.side {
            Side::Buy => (price - self.entry_price) * self.amount,
            Side::Sell => (self.entry_price - price) * self.amount,
        }
    }

    /// Unrealized P&L at `price` as a percentage of the entry price.
    pub fn unrealized_pnl_pct(&self, price: Decimal) -> Decimal {
        if self.entry_price == Decimal::ZERO {
            return Decimal::ZERO;
        }
        let diff = match self.side {
            Side::Buy => price - self.entry_price,
            Side::Sell => self.entry_price - price,
        };
        diff / self.entry_price * Decimal::ONE_HUNDRED
    }

    /// Hours elapsed since entry.
    pub fn held_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.entry_time).num_seconds() as f64 / 3600.0
    }

    pub fn stop_hit(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => price <= self.stop_loss,
            Side::Sell => price >= self.stop_loss,
        }
    }

    pub fn take_profit_hit(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => price >= self.take_profit,
            Side::Sell => price <= self.take_profit,
        }
    }
}

/// Cash/asset ledger. Mutated only by the execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Quote currency available
    pub cash_balance: Decimal,
    /// Base asset held
    pub asset_balance: Decimal,
    /// Last mark price
    pub last_price: Decimal,
    /// cash + asset at the mark price
    pub total_value: Decimal,
    pub initial_value: Decimal,
    /// Highest total value seen (for drawdown)
    pub peak_value: Decimal,
    /// Fills executed on `last_trade_date`
    pub daily_trade_count: u32,
    pub last_trade_date: Option<NaiveDate>,
}

impl Portfolio {
    /// Create a new portfolio holding only cash.
    pub fn new(initial_value: Decimal) -> Self {
        Self {
            cash_balance: initial_value,
            asset_balance: Decimal::ZERO,
            last_price: Decimal::ZERO,
            total_value: initial_value,
            initial_value,
            peak_value: initial_value,
            daily_trade_count: 0,
            last_trade_date: None,
        }
    }

    /// Revalue the ledger at `price`.
    pub fn mark(&mut self, price: Decimal) {
        self.last_price = price;
        self.total_value = self.cash_balance + self.asset_balance * price;
        if self.total_value > self.peak_value {
            self.peak_value = self.total_value;
        }
    }

    /// Reset the daily trade count when `date` differs from the last trade date.
    /// Returns true if a rollover happened.
    pub fn roll_day(&mut self, date: NaiveDate) -> bool {
        match self.last_trade_date {
            Some(last) if last == date => false,
            _ => {
                self.daily_trade_count = 0;
                self.last_trade_date = Some(date);
                true
            }
        }
    }

    /// Apply a confirmed fill: move cash and asset, charge the fee, count the trade.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<(), BrokerError> {
        let notional = fill.notional();
        match fill.side {
            Side::Buy => {
                let required = notional + fill.fee;
                if required > self.cash_balance {
                    return Err(BrokerError::InsufficientFunds {
                        required,
                        available: self.cash_balance,
                    });
                }
                self.cash_balance -= required;
                self.asset_balance += fill.amount;
            }
            Side::Sell => {
                if fill.amount > self.asset_balance {
                    return Err(BrokerError::InsufficientAsset {
                        required: fill.amount,
                        available: self.asset_balance,
                    });
                }
                self.cash_balance += notional - fill.fee;
                self.asset_balance -= fill.amount;
            }
        }

        self.roll_day(fill.timestamp.date_naive());
        self.daily_trade_count += 1;
        self.mark(fill.price);
        Ok(())
    }

    /// Current drawdown from peak, in percent.
    pub fn drawdown_pct(&self) -> Decimal {
        if self.peak_value == Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.peak_value - self.total_value) / self.peak_value * Decimal::ONE_HUNDRED
    }

    /// Total return since inception, in percent.
    pub fn total_return_pct(&self) -> Decimal {
        if self.initial_value == Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.total_value - self.initial_value) / self.initial_value * Decimal::ONE_HUNDRED
    }
}
