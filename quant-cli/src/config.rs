//! JSON-loadable run configuration for the `quant` binary: the fields `quant_engine::EngineConfig`
//! needs plus the paper-mode account/price seed data used to drive the mock ports.

use indexmap::IndexMap;
use quant_engine::{DeploymentMode, EngineConfig};
use quant_instrument::{Symbol, SymbolError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid strategy weight symbol: {0}")]
    InvalidSymbol(#[from] SymbolError),
}

#[derive(Debug, Deserialize)]
pub struct PaperAccount {
    pub total_value: Decimal,
    pub cash: Decimal,
    pub buying_power: Decimal,
}

impl Default for PaperAccount {
    fn default() -> Self {
        Self { total_value: dec!(10000), cash: dec!(10000), buying_power: dec!(10000) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub deployment_mode: DeploymentModeConfig,
    pub persistence_prefix: String,
    pub daily_trade_limit_usd: Decimal,
    pub equity_deployment_pct: Decimal,
    pub leverage_enabled: bool,
    pub margin_utilization_ceiling_pct: Decimal,
    pub maintenance_buffer_floor_pct: Decimal,
    pub max_position_weight_cap: Decimal,
    pub min_trade_amount_usd: Decimal,
    pub max_drift_tolerance: Decimal,
    pub max_slippage_bps: Decimal,
    pub cash_proxy_symbol: String,
    pub default_strategy_id: String,
    pub run_deadline_secs: u64,
    pub settlement_timeout_secs: u64,
    pub settlement_poll_interval_secs: u64,
    pub order_history_limit: usize,
    pub extended_hours: bool,
    pub strategy_weights: HashMap<String, Decimal>,
    pub paper_account: PaperAccount,
    pub paper_prices: HashMap<String, Decimal>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentModeConfig {
    #[default]
    Paper,
    Live,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            deployment_mode: DeploymentModeConfig::Paper,
            persistence_prefix: "paper".to_string(),
            daily_trade_limit_usd: dec!(25000),
            equity_deployment_pct: dec!(1.0),
            leverage_enabled: false,
            margin_utilization_ceiling_pct: dec!(0.8),
            maintenance_buffer_floor_pct: dec!(0.1),
            max_position_weight_cap: dec!(0.3),
            min_trade_amount_usd: dec!(50),
            max_drift_tolerance: dec!(0.05),
            max_slippage_bps: dec!(20),
            cash_proxy_symbol: "BIL".to_string(),
            default_strategy_id: "DEFAULT".to_string(),
            run_deadline_secs: 600,
            settlement_timeout_secs: 60,
            settlement_poll_interval_secs: 2,
            order_history_limit: 1000,
            extended_hours: false,
            strategy_weights: HashMap::new(),
            paper_account: PaperAccount::default(),
            paper_prices: HashMap::new(),
        }
    }
}

impl CliConfig {
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut strategy_weights = HashMap::new();
        for (name, weight) in &self.strategy_weights {
            strategy_weights.insert(quant_instrument::StrategyId::new(name), *weight);
        }

        let mut config = EngineConfig::paper_defaults(strategy_weights, self.daily_trade_limit_usd);
        config.deployment_mode = match self.deployment_mode {
            DeploymentModeConfig::Paper => DeploymentMode::Paper,
            DeploymentModeConfig::Live => DeploymentMode::Live,
        };
        config.persistence_prefix = self.persistence_prefix.clone();
        config.equity_deployment_pct = self.equity_deployment_pct;
        config.leverage_enabled = self.leverage_enabled;
        config.margin_utilization_ceiling_pct = self.margin_utilization_ceiling_pct;
        config.maintenance_buffer_floor_pct = self.maintenance_buffer_floor_pct;
        config.max_position_weight_cap = self.max_position_weight_cap;
        config.min_trade_amount_usd = self.min_trade_amount_usd;
        config.max_drift_tolerance = self.max_drift_tolerance;
        config.max_slippage_bps = self.max_slippage_bps;
        config.cash_proxy_symbol = Symbol::new(&self.cash_proxy_symbol)?;
        config.default_strategy_id = quant_instrument::StrategyId::new(&self.default_strategy_id);
        config.run_deadline = Duration::from_secs(self.run_deadline_secs);
        config.settlement_timeout = Duration::from_secs(self.settlement_timeout_secs);
        config.settlement_poll_interval = Duration::from_secs(self.settlement_poll_interval_secs);
        config.order_history_limit = self.order_history_limit;
        config.extended_hours = self.extended_hours;

        Ok(config)
    }

    /// The paper-mode seed prices re-keyed to `Symbol`, used to value positions for the daily
    /// P&L archive. Invalid tickers are skipped rather than failing the whole run.
    pub fn paper_prices_as_symbols(&self) -> IndexMap<Symbol, Decimal> {
        self.paper_prices
            .iter()
            .filter_map(|(symbol, price)| Symbol::new(symbol).ok().map(|s| (s, *price)))
            .collect()
    }
}
