//! Backtest report and its text, JSON and CSV renderings.

use rust_decimal::Decimal;
use sentinel_core::types::{EngineState, Portfolio, TradeRecord};
use sentinel_engine::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::simulator::BacktestConfig;
use crate::statistics::{EquityPoint, PerformanceReport};

/// Everything a backtest run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub config: BacktestConfig,
    pub pipeline: PipelineConfig,
    pub performance: PerformanceReport,
    pub final_portfolio: Portfolio,
    pub final_state: EngineState,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

const RULE: &str = "───────────────────────────────────────────────────────────";
const BANNER: &str = "═══════════════════════════════════════════════════════════";

fn rows(out: &mut String, title: Option<&str>, entries: &[(&str, String)]) {
    if let Some(title) = title {
        let _ = writeln!(out, "{}\n{}", title, RULE);
    }
    for (label, value) in entries {
        let _ = writeln!(out, "  {:<21}{}", format!("{}:", label), value);
    }
    out.push('\n');
}

impl BacktestReport {
    /// Fixed-width text summary for the terminal.
    pub fn summary(&self) -> String {
        let p = &self.performance;
        let usd = |v: Decimal| format!("${:.2}", v);
        let pct = |v: Decimal| format!("{:.2}%", v);

        let mut out = format!("{}\n{:^59}\n{}\n\n", BANNER, "BACKTEST REPORT", BANNER);
        rows(
            &mut out,
            None,
            &[
                ("Instrument", format!("{} ({})", self.config.symbol, self.config.timeframe)),
                ("Strategy Mode", format!("{:?}", self.pipeline.engine.strategy_mode)),
            ],
        );
        rows(
            &mut out,
            Some("PERFORMANCE"),
            &[
                ("Initial Capital", usd(p.initial_capital)),
                ("Final Value", usd(p.final_value)),
                ("Total Profit", usd(p.total_profit)),
                ("ROI", pct(p.roi)),
                ("Max Drawdown", pct(p.max_drawdown_pct)),
                ("Fees Paid", usd(p.total_fees)),
            ],
        );
        rows(
            &mut out,
            Some("TRADE STATISTICS"),
            &[
                ("Total Trades", p.total_trades.to_string()),
                ("Closed Trades", p.closed_trades.to_string()),
                ("Winning Trades", p.win_count.to_string()),
                ("Losing Trades", p.loss_count.to_string()),
                ("Win Rate", pct(p.win_rate)),
                ("Avg Profit", usd(p.avg_profit)),
                ("Avg Loss", usd(p.avg_loss)),
                ("Profit Factor", format!("{:.2}", p.profit_factor)),
            ],
        );
        let open = if self.final_state.position.is_some() { "yes" } else { "no" };
        rows(
            &mut out,
            Some("EXECUTION"),
            &[
                ("Bars Processed", p.bars_processed.to_string()),
                ("Warm-up Bars", self.config.warm_up.to_string()),
                ("Open Position", open.to_string()),
            ],
        );
        out.push_str(BANNER);
        out.push('\n');
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Equity curve as `timestamp,equity` CSV.
    pub fn equity_to_csv(&self) -> String {
        self.equity_curve.iter().fold(String::from("timestamp,equity\n"), |mut csv, point| {
            let _ = writeln!(csv, "{},{}", point.timestamp, point.value);
            csv
        })
    }
}
