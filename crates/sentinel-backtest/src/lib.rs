//! Backtesting: replays historical bars through the same pipeline the live
//! trader runs, with simulated fills.

mod report;
mod simulator;
mod statistics;

pub use report::BacktestReport;
pub use simulator::{BacktestConfig, BacktestSimulator, MIN_WARM_UP};
pub use statistics::{EquityPoint, PerformanceReport, PerformanceTracker};
