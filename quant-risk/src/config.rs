use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;

/// The subset of engine configuration the Rebalance Planner needs to turn a consolidated
/// portfolio into a plan. Owned here rather than borrowed from `quant` so this crate stays a
/// pure function of its explicit inputs, with no dependency back on the crate that assembles
/// the full run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub equity_deployment_pct: Decimal,
    pub leverage_enabled: bool,
    pub margin_utilization_ceiling_pct: Decimal,
    pub maintenance_buffer_floor_pct: Decimal,
    pub max_position_weight_cap: Decimal,
    pub min_trade_amount_usd: Decimal,
    pub default_strategy_id: StrategyId,
    pub cash_proxy_symbol: Symbol,
    /// Tolerance, as a weight fraction, for how far a position may drift from its target
    /// before a future run would flag it for rebalancing. Carried on every plan for downstream
    /// consumers (dashboards, reporting) rather than enforced by the Planner itself.
    pub max_drift_tolerance: Decimal,
}
