//! Paper exchange for simulated trading.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::error::BrokerError;
use sentinel_core::traits::OrderExecutor;
use sentinel_core::types::{Fill, OrderRequest, Portfolio, Side};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Simulated exchange filling market orders at the decision price.
///
/// Fills reuse the request's client order id, so identical request streams
/// produce identical fills.
#[derive(Clone)]
pub struct PaperExchange {
    portfolio: Arc<Mutex<Portfolio>>,
    fills: Arc<Mutex<Vec<Fill>>>,
    /// Fee as a fraction of notional
    fee_rate: Decimal,
    /// Adverse price move applied to each fill, in percent
    slippage_pct: Decimal,
}

impl PaperExchange {
    /// Create a new paper exchange holding `initial_capital` in cash.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            portfolio: Arc::new(Mutex::new(Portfolio::new(initial_capital))),
            fills: Arc::new(Mutex::new(Vec::new())),
            fee_rate: dec!(0.001),
            slippage_pct: Decimal::ZERO,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Revalue the ledger at `price`.
    pub fn mark(&self, price: Decimal) {
        self.portfolio.lock().unwrap().mark(price);
    }

    pub fn portfolio_snapshot(&self) -> Portfolio {
        self.portfolio.lock().unwrap().clone()
    }

    pub fn fills(&self) -> Vec<Fill> {
        self.fills.lock().unwrap().clone()
    }

    fn fill_price(&self, side: Side, price: Decimal) -> Decimal {
        let slip = self.slippage_pct / Decimal::ONE_HUNDRED;
        match side {
            Side::Buy => price * (Decimal::ONE + slip),
            Side::Sell => price * (Decimal::ONE - slip),
        }
    }
}

#[async_trait]
impl OrderExecutor for PaperExchange {
    async fn execute(&self, request: OrderRequest) -> Result<Fill, BrokerError> {
        if request.price_hint <= Decimal::ZERO {
            return Err(BrokerError::InvalidPrice(request.price_hint.to_string()));
        }
        if request.amount <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(format!(
                "Order amount must be positive, got {}",
                request.amount
            )));
        }

        let price = self.fill_price(request.side, request.price_hint);
        let fill = Fill {
            id: request.client_order_id.clone(),
            side: request.side,
            amount: request.amount,
            price,
            fee: request.amount * price * self.fee_rate,
            timestamp: request.timestamp,
        };

        // Ledger rejects unaffordable orders before any state changes
        self.portfolio.lock().unwrap().apply_fill(&fill)?;
        self.fills.lock().unwrap().push(fill.clone());

        info!(
            id = %fill.id,
            symbol = %request.symbol,
            side = %fill.side,
            amount = %fill.amount,
            price = %fill.price,
            fee = %fill.fee,
            "Paper fill"
        );
        Ok(fill)
    }

    async fn account(&self) -> Result<Portfolio, BrokerError> {
        Ok(self.portfolio.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "paper-exchange"
    }
}
