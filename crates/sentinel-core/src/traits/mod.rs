//! Collaborator traits for the decision engine.

mod executor;
mod indicator;
mod market_data;
mod store;

pub use executor::OrderExecutor;
pub use indicator::{BarIndicator, Indicator};
pub use market_data::MarketData;
pub use store::StateStore;
