use crate::error::ExecutionError;
use crate::order::{OrderRequest, OrderState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quant_instrument::{BrokerPosition, MarginInfo, Symbol};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub total_value: Decimal,
    pub cash: Decimal,
    pub equity: Decimal,
    pub margin_info: MarginInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDescriptor {
    pub order_id: String,
    pub symbol: Symbol,
}

/// An order-status poll result: the broker's wire schema carries id, status, filled quantity,
/// filled average price and timestamps (spec's "Order status responses" in the broker
/// submission interface).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusReport {
    pub order_id: String,
    pub state: OrderState,
    pub filled_quantity: Decimal,
    pub filled_avg_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_size: Decimal,
    pub ask_size: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn is_valid(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO && self.bid < self.ask
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Broker account operations. Implementations are expected to hold their own short-TTL
/// (~60s) cache internally; the engine does not second-guess freshness and must not be called
/// from a hot path without a surrounding timeout.
#[async_trait]
pub trait AccountPort: Send + Sync {
    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, ExecutionError>;
    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, ExecutionError>;
    async fn get_open_orders(&self) -> Result<Vec<OrderDescriptor>, ExecutionError>;
    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExecutionError>;
    async fn liquidate_position(&self, symbol: &Symbol) -> Result<String, ExecutionError>;
    async fn submit_order(&self, request: &OrderRequest) -> Result<String, ExecutionError>;
    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatusReport, ExecutionError>;
}

/// Market data operations required to price orders intelligently.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, ExecutionError>;
    async fn get_latest_quote(&self, symbol: &Symbol) -> Result<Option<Quote>, ExecutionError>;
    async fn is_fractionable(&self, symbol: &Symbol) -> Result<bool, ExecutionError>;
}
