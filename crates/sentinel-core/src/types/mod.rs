//! Core data types.

mod ohlcv;
mod order;
mod position;
mod prediction;
mod state;
mod timeframe;

pub use ohlcv::Bar;
pub use order::{Action, Fill, OrderRequest, Side};
pub use position::{Portfolio, Position};
pub use prediction::ExternalPrediction;
pub use state::{DailyCounter, EngineState, PendingOrder, Phase, TradeRecord, TradeStats, WeeklyPnl};
pub use timeframe::Timeframe;
