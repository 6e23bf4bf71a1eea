//! Decision engine for the sentinel trading system.
//!
//! Joins the technical analysis with risk and optional advisory predictions
//! into BUY/SELL/HOLD decisions over an explicit, versioned [`EngineState`],
//! and drives the live trading cycle.
//!
//! [`EngineState`]: sentinel_core::EngineState

pub mod config;
pub mod decision;
pub mod pipeline;
pub mod prediction;
pub mod trader;

pub use config::{EngineConfig, StrategyMode};
pub use decision::{Decision, DecisionEngine, DecisionInput};
pub use pipeline::{Analysis, Pipeline, PipelineConfig};
pub use prediction::{MarketSnapshot, PredictionProvider, PredictionProxy, ProviderChain, TechnicalProxy};
pub use trader::{CycleReport, Trader, TraderConfig};
