//! Actions, order requests and fills.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Per-cycle outcome of signals, predictions and decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Action {
    /// The order side this action maps to, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            Action::Buy => Some(Side::Buy),
            Action::Sell => Some(Side::Sell),
            Action::Hold => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Action::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Market order handed to the order execution sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-side identifier, reused as the fill/trade id by deterministic sinks
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    /// Quantity in base-asset units
    pub amount: Decimal,
    /// Price the decision was made at; sinks may fill elsewhere
    pub price_hint: Decimal,
    /// Decision time
    pub timestamp: DateTime<Utc>,
}

impl OrderRequest {
    pub fn market(
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        amount: Decimal,
        price_hint: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            symbol: symbol.into(),
            side,
            amount,
            price_hint,
            timestamp,
        }
    }

    /// Notional value at the hinted price.
    pub fn notional(&self) -> Decimal {
        self.amount * self.price_hint
    }
}

/// Confirmed execution returned by the order execution sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: String,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
    /// Fee charged in quote currency
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    pub fn notional(&self) -> Decimal {
        self.amount * self.price
    }
}
