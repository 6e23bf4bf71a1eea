//! Error types.
//!
//! Each collaborator has its own enum; `TradingError` wraps them so engine
//! operations can use `?` across crate boundaries.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{Phase, Side};

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Risk(#[from] RiskError),
}

/// Failures reported by the order executor.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Insufficient asset: need {required}, have {available}")]
    InsufficientAsset { required: Decimal, available: Decimal },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Order not confirmed within {0} ms")]
    Timeout(u64),
}

/// Failures reported by the market data feed.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Unknown symbol {0}")]
    SymbolNotFound(String),

    #[error("No data available")]
    NoDataAvailable,

    #[error("Feed unreachable: {0}")]
    ConnectionError(String),

    #[error("Malformed data: {0}")]
    ParseError(String),

    #[error("Feed did not answer within {0} ms")]
    Timeout(u64),
}

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Need {required} values, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid indicator parameter: {0}")]
    InvalidParameter(String),
}

/// Prediction provider failures. The engine treats every one as "no prediction".
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Provider {0} is unavailable")]
    Unavailable(String),

    #[error("Provider {provider} did not answer within {millis} ms")]
    Timeout { provider: String, millis: u64 },
}

/// Trade/prediction log and snapshot failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Illegal position state machine transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Cannot {action} while {phase:?}")]
    InvalidTransition { phase: Phase, action: &'static str },

    #[error("Fill side {0} does not match the pending order")]
    SideMismatch(Side),
}

/// Risk scoring failures. The assessor turns these into a HIGH assessment.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Non-finite value for {0}")]
    NonFinite(&'static str),

    #[error("Invalid risk input: {0}")]
    InvalidInput(String),
}

pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wrapped_errors_keep_their_message() {
        let err: TradingError = BrokerError::InsufficientFunds {
            required: dec!(100),
            available: dec!(40),
        }
        .into();
        assert_eq!(err.to_string(), "Insufficient funds: need 100, have 40");

        let err: TradingError = StateError::InvalidTransition {
            phase: Phase::Flat,
            action: "exit",
        }
        .into();
        assert_eq!(err.to_string(), "Cannot exit while Flat");
    }
}
