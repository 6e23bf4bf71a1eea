//! Advisory predictions from external providers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Action;

/// Directional recommendation from an advisory provider. Optional input to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPrediction {
    pub signal: Action,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Provider label, e.g. `technical-proxy`
    pub provider: String,
    pub reasoning: String,
    pub target_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl ExternalPrediction {
    pub fn new(
        signal: Action,
        confidence: f64,
        provider: impl Into<String>,
        reasoning: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            signal,
            confidence: confidence.clamp(0.0, 1.0),
            provider: provider.into(),
            reasoning: reasoning.into(),
            target_price: None,
            stop_price: None,
            timestamp,
        }
    }

    pub fn with_levels(mut self, target: Option<Decimal>, stop: Option<Decimal>) -> Self {
        self.target_price = target;
        self.stop_price = stop;
        self
    }

    /// True if the prediction agrees with `action` and is confident enough.
    pub fn confirms(&self, action: Action, threshold: f64) -> bool {
        self.signal == action && self.confidence > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirms() {
        let p = ExternalPrediction::new(Action::Buy, 0.65, "p", "", DateTime::default());
        assert!(p.confirms(Action::Buy, 0.6));
        assert!(!p.confirms(Action::Sell, 0.6));
        // Threshold is exclusive
        assert!(!p.confirms(Action::Buy, 0.65));
    }

    #[test]
    fn test_confidence_clamped() {
        let p = ExternalPrediction::new(Action::Sell, 1.7, "p", "", DateTime::default());
        assert_eq!(p.confidence, 1.0);
    }
}
