//! Backtest performance statistics.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::types::TradeRecord;
use serde::{Deserialize, Serialize};

/// Account value after a bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Bar timestamp (Unix ms)
    pub timestamp: i64,
    pub value: Decimal,
}

/// Backtest performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub initial_capital: Decimal,
    pub final_value: Decimal,
    /// Executed trades, entries and exits
    pub total_trades: usize,
    /// Exits with realized P&L
    pub closed_trades: usize,
    pub win_count: usize,
    /// Closed trades with P&L <= 0
    pub loss_count: usize,
    /// Winning share of closed trades, in percent
    pub win_rate: Decimal,
    pub avg_profit: Decimal,
    /// Average loss magnitude
    pub avg_loss: Decimal,
    /// avg_profit / avg_loss; zero without losses
    pub profit_factor: Decimal,
    /// final_value - initial_capital
    pub total_profit: Decimal,
    /// total_profit / initial_capital, in percent
    pub roi: Decimal,
    pub max_drawdown_pct: Decimal,
    pub total_fees: Decimal,
    pub bars_processed: usize,
}

/// Accumulates equity and trades while the simulation runs.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    initial_capital: Decimal,
    peak: Decimal,
    max_drawdown_pct: Decimal,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
}

impl PerformanceTracker {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            peak: initial_capital,
            max_drawdown_pct: Decimal::ZERO,
            equity_curve: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Record equity after a bar.
    pub fn record_equity(&mut self, timestamp: i64, value: Decimal) {
        self.equity_curve.push(EquityPoint { timestamp, value });

        if value > self.peak {
            self.peak = value;
        }
        if self.peak > Decimal::ZERO {
            let drawdown = (self.peak - value) / self.peak * dec!(100);
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    pub fn add_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Final statistics, plus the trade list and equity curve.
    pub fn finish(self, final_value: Decimal) -> (PerformanceReport, Vec<TradeRecord>, Vec<EquityPoint>) {
        let mut win_count = 0usize;
        let mut loss_count = 0usize;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut total_fees = Decimal::ZERO;

        for trade in &self.trades {
            total_fees += trade.fee;
            if let Some(pnl) = trade.pnl {
                if pnl > Decimal::ZERO {
                    win_count += 1;
                    gross_profit += pnl;
                } else {
                    loss_count += 1;
                    gross_loss += pnl.abs();
                }
            }
        }

        let closed_trades = win_count + loss_count;
        let win_rate = if closed_trades > 0 {
            Decimal::from(win_count * 100) / Decimal::from(closed_trades)
        } else {
            Decimal::ZERO
        };
        let avg_profit = if win_count > 0 {
            gross_profit / Decimal::from(win_count)
        } else {
            Decimal::ZERO
        };
        let avg_loss = if loss_count > 0 {
            gross_loss / Decimal::from(loss_count)
        } else {
            Decimal::ZERO
        };
        let profit_factor = if avg_loss > Decimal::ZERO {
            avg_profit / avg_loss
        } else {
            Decimal::ZERO
        };

        let total_profit = final_value - self.initial_capital;
        let roi = if self.initial_capital > Decimal::ZERO {
            total_profit / self.initial_capital * dec!(100)
        } else {
            Decimal::ZERO
        };

        let report = PerformanceReport {
            initial_capital: self.initial_capital,
            final_value,
            total_trades: self.trades.len(),
            closed_trades,
            win_count,
            loss_count,
            win_rate,
            avg_profit,
            avg_loss,
            profit_factor,
            total_profit,
            roi,
            max_drawdown_pct: self.max_drawdown_pct,
            total_fees,
            bars_processed: self.equity_curve.len(),
        };
        (report, self.trades, self.equity_curve)
    }
}
