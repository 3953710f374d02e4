use chrono::{DateTime, Utc};
use quant_instrument::{ExecutionUrgency, StrategyId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlanAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlanItem {
    pub symbol: Symbol,
    pub action: PlanAction,
    pub trade_amount: Decimal,
    pub current_value: Decimal,
    pub target_value: Decimal,
    pub current_weight: Decimal,
    pub target_weight: Decimal,
    pub priority: u8,
    pub strategy_id: StrategyId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub plan_id: String,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<RebalancePlanItem>,
    pub total_portfolio_value: Decimal,
    pub total_trade_value: Decimal,
    pub max_drift_tolerance: Decimal,
    pub execution_urgency: ExecutionUrgency,
}

impl RebalancePlan {
    pub fn buys(&self) -> impl Iterator<Item = &RebalancePlanItem> {
        self.items.iter().filter(|item| matches!(item.action, PlanAction::Buy))
    }

    pub fn sells(&self) -> impl Iterator<Item = &RebalancePlanItem> {
        self.items.iter().filter(|item| matches!(item.action, PlanAction::Sell))
    }
}
