//! Trend classification and signal fusion.
//!
//! - `TrendClassifier` labels short and long horizon trends
//! - `SignalFusion` turns indicator votes plus trend context into one
//!   `CompositeSignal` with an ordered reasons trail

mod fusion;
mod trend;

pub use fusion::{CompositeSignal, FusionConfig, SignalFusion, SignalMode, Votes};
pub use trend::{
    LongTrend, MarketContext, ShortTrend, TrendClassifier, TrendConfig, TrendDirection,
    TrendStrength, VolumeRegime, VolumeState, VolumeTrend,
};
