use crate::position::StrategyPosition;
use quant_instrument::StrategyId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// P&L for a single strategy, recomputed on demand against a fresh set of current prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPnL {
    pub strategy_id: StrategyId,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub positions: Vec<StrategyPosition>,
    pub allocation_value: Decimal,
}

impl StrategyPnL {
    pub fn total(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl
    }

    /// `total / allocation_value`, or zero when there is no allocation to divide by.
    pub fn total_return_pct(&self) -> Decimal {
        if self.allocation_value.is_zero() {
            Decimal::ZERO
        } else {
            self.total() / self.allocation_value
        }
    }
}
