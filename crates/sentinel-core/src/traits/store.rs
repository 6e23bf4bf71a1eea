//! Persistence trait definition.

use crate::error::StoreError;
use crate::types::{EngineState, ExternalPrediction, TradeRecord};
use async_trait::async_trait;

/// Append-only record of trades and predictions plus the engine snapshot.
///
/// The snapshot is read only at startup; the in-memory `EngineState` is
/// authoritative afterwards.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError>;

    async fn record_prediction(&self, prediction: &ExternalPrediction) -> Result<(), StoreError>;

    async fn save_snapshot(&self, state: &EngineState) -> Result<(), StoreError>;

    /// Load the last saved snapshot, if any.
    async fn load_snapshot(&self) -> Result<Option<EngineState>, StoreError>;
}
