use chrono::{DateTime, Utc};
use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the market an order record represents. Kept local to this crate rather than
/// reused from `quant-execution::OrderRequest` so the Tracker stays a leaf with no dependency
/// on the Execution Engine — it only ever learns about a fill after the fact.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Per-(strategy, symbol) cost basis, the single source of truth for P&L attribution. Broker
/// positions are used only for total-shares reconciliation; this is what the Tracker persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPosition {
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub total_cost: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl StrategyPosition {
    pub fn flat(strategy_id: StrategyId, symbol: Symbol, at: DateTime<Utc>) -> Self {
        Self {
            strategy_id,
            symbol,
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            last_updated: at,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn market_value(&self, current_price: Decimal) -> Decimal {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        self.quantity * (current_price - self.average_cost)
    }
}

/// A single filled order as recorded in the bounded order log
/// (`strategy_orders/recent_orders.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}
