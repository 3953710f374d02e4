use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::time::Duration;

/// Paper vs. live trading. A plain boolean in the original; kept as an enum here so a caller
/// can't accidentally pass the wrong bool to the wrong parameter.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DeploymentMode {
    Paper,
    Live,
}

impl DeploymentMode {
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Everything a single `run()` call needs that isn't a port or a strategy implementation.
/// Reduced from the original `the_alchemiser.shared.config.config` settings surface to what the
/// pipeline itself consumes — credential/endpoint loading is a caller concern, supplied via the
/// ports rather than read here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub equity_deployment_pct: Decimal,
    pub leverage_enabled: bool,
    pub margin_utilization_ceiling_pct: Decimal,
    pub maintenance_buffer_floor_pct: Decimal,
    pub max_position_weight_cap: Decimal,
    pub min_trade_amount_usd: Decimal,
    pub max_drift_tolerance: Decimal,
    pub max_slippage_bps: Decimal,
    pub daily_trade_limit_usd: Decimal,
    pub cash_proxy_symbol: Symbol,
    pub default_strategy_id: StrategyId,
    pub run_deadline: Duration,
    pub settlement_timeout: Duration,
    pub settlement_poll_interval: Duration,
    pub order_history_limit: usize,
    pub strategy_weights: HashMap<StrategyId, Decimal>,
    pub deployment_mode: DeploymentMode,
    pub persistence_prefix: String,
    pub extended_hours: bool,
}

impl EngineConfig {
    /// Spec defaults, for the fields that have one: deployment 100% equity, no leverage,
    /// drift tolerance 5%, slippage budget 20bps, run deadline 10 minutes, settlement timeout
    /// 60s polled every 2s, order history bounded to the last 1000 entries.
    pub fn paper_defaults(strategy_weights: HashMap<StrategyId, Decimal>, daily_trade_limit_usd: Decimal) -> Self {
        Self {
            equity_deployment_pct: dec!(1.0),
            leverage_enabled: false,
            margin_utilization_ceiling_pct: dec!(0.8),
            maintenance_buffer_floor_pct: dec!(0.1),
            max_position_weight_cap: dec!(0.3),
            min_trade_amount_usd: dec!(50),
            max_drift_tolerance: dec!(0.05),
            max_slippage_bps: dec!(20),
            daily_trade_limit_usd,
            cash_proxy_symbol: Symbol::new("BIL").expect("BIL is a valid ticker"),
            default_strategy_id: StrategyId::new("DEFAULT"),
            run_deadline: Duration::from_secs(600),
            settlement_timeout: Duration::from_secs(60),
            settlement_poll_interval: Duration::from_secs(2),
            order_history_limit: 1000,
            strategy_weights,
            deployment_mode: DeploymentMode::Paper,
            persistence_prefix: "paper".to_string(),
            extended_hours: false,
        }
    }
}
