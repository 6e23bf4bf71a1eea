//! Order execution trait definition.

use crate::error::BrokerError;
use crate::types::{Fill, OrderRequest, Portfolio};
use async_trait::async_trait;

/// Order execution sink.
///
/// Exactly one call per non-HOLD decision. Callers never retry; a failure
/// aborts the pending transition and leaves the position untouched.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Execute a market order and return the confirmed fill.
    async fn execute(&self, request: OrderRequest) -> Result<Fill, BrokerError>;

    /// Current account ledger.
    async fn account(&self) -> Result<Portfolio, BrokerError>;

    /// Get the executor name.
    fn name(&self) -> &str;
}
