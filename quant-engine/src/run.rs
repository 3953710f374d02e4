use crate::config::EngineConfig;
use crate::deps::EngineDeps;
use crate::error::EngineError;
use crate::result::{warnings_from_aggregate, warnings_from_execution, ErrorReport, TradeRunResult};
use chrono::Utc;
use indexmap::IndexMap;
use quant_execution::{ExecutionConfig, ExecutionEngine, OrderSide};
use quant_instrument::PortfolioSnapshot;
use quant_risk::PlannerConfig;
use quant_strategy::aggregate;
use quant_tracker::Side;
use rust_decimal::Decimal;
use uuid::Uuid;

fn planner_config(config: &EngineConfig) -> PlannerConfig {
    PlannerConfig {
        equity_deployment_pct: config.equity_deployment_pct,
        leverage_enabled: config.leverage_enabled,
        margin_utilization_ceiling_pct: config.margin_utilization_ceiling_pct,
        maintenance_buffer_floor_pct: config.maintenance_buffer_floor_pct,
        max_position_weight_cap: config.max_position_weight_cap,
        min_trade_amount_usd: config.min_trade_amount_usd,
        default_strategy_id: config.default_strategy_id.clone(),
        cash_proxy_symbol: config.cash_proxy_symbol.clone(),
        max_drift_tolerance: config.max_drift_tolerance,
    }
}

fn execution_config(config: &EngineConfig) -> ExecutionConfig {
    ExecutionConfig {
        settlement_timeout: config.settlement_timeout,
        settlement_poll_interval: config.settlement_poll_interval,
        run_deadline: config.run_deadline,
        max_slippage_bps: config.max_slippage_bps,
        extended_hours: config.extended_hours,
        retry_policy: Default::default(),
    }
}

fn tracker_side(side: OrderSide) -> Side {
    match side {
        OrderSide::Buy => Side::Buy,
        OrderSide::Sell => Side::Sell,
    }
}

async fn build_snapshot(account: &dyn quant_execution::AccountPort) -> Result<PortfolioSnapshot, EngineError> {
    let snapshot = account.get_account_snapshot().await?;
    let broker_positions = account.get_positions().await?;

    let mut positions = IndexMap::new();
    let mut prices = IndexMap::new();
    for position in broker_positions {
        positions.insert(position.symbol.clone(), position.quantity);
        prices.insert(position.symbol, position.current_price);
    }

    PortfolioSnapshot::new(snapshot.total_value, snapshot.cash, positions, prices, Some(snapshot.margin_info))
        .map_err(|err| EngineError::Configuration(format!("invalid account snapshot: {err}")))
}

/// The single pipeline entry point: Signal Aggregator → Rebalance Planner → Execution Engine →
/// Strategy Tracker, returning one serializable [`TradeRunResult`] regardless of where in the
/// pipeline the run stopped.
pub async fn run(deps: &EngineDeps, config: &EngineConfig, correlation_id: Option<Uuid>) -> TradeRunResult {
    let correlation_id = correlation_id.unwrap_or_else(Uuid::new_v4);
    let started_at = Utc::now();
    let mut warnings = Vec::new();

    let snapshot = match build_snapshot(deps.account.as_ref()).await {
        Ok(snapshot) => snapshot,
        Err(err) => return failed_result(correlation_id, started_at, Vec::new(), err, warnings),
    };

    let mut signals_by_strategy: IndexMap<quant_instrument::StrategyId, Vec<_>> = IndexMap::new();
    for (strategy_id, strategy) in deps.strategies.iter() {
        match strategy.evaluate(&snapshot).await {
            Ok(signals) => {
                signals_by_strategy.insert(strategy_id.clone(), signals);
            }
            Err(err) => {
                tracing::warn!(%strategy_id, error = %err, "strategy evaluation failed, sidelining its signals for this run");
                warnings.push(format!("strategy {strategy_id} sidelined: {err}"));
            }
        }
    }

    let all_signals: Vec<_> = signals_by_strategy.values().flatten().cloned().collect();

    let strategy_weights: IndexMap<quant_instrument::StrategyId, Decimal> =
        config.strategy_weights.iter().map(|(id, weight)| (id.clone(), *weight)).collect();

    let (consolidated, aggregate_warnings) =
        aggregate(&signals_by_strategy, &strategy_weights, &config.cash_proxy_symbol, None);
    warnings.extend(warnings_from_aggregate(&aggregate_warnings));

    let plan = match quant_risk::build_plan(&consolidated, &snapshot, &planner_config(config), correlation_id) {
        Ok(plan) => plan,
        Err(err) => {
            return failed_result(correlation_id, started_at, all_signals, EngineError::from(err), warnings)
                .with_consolidated(consolidated)
        }
    };

    let ctx = quant_integration::RunContext::root(correlation_id);
    let engine = ExecutionEngine::new(
        deps.account.clone(),
        deps.market.clone(),
        deps.daily_limit.clone(),
        execution_config(config),
    );
    let execution_result = engine.execute(&plan, &ctx).await;
    warnings.extend(warnings_from_execution(&execution_result));

    for filled in &execution_result.filled_orders {
        deps.tracker
            .record_order(
                filled.order_id.clone(),
                filled.strategy_id.clone(),
                filled.symbol.clone(),
                tracker_side(filled.side),
                filled.filled_quantity,
                filled.avg_fill_price,
                filled.filled_at,
            )
            .await;
    }

    let completed_at = Utc::now();
    let success = execution_result.success;

    TradeRunResult {
        success,
        correlation_id,
        started_at,
        completed_at,
        signals_by_strategy: all_signals,
        consolidated_portfolio: Some(consolidated),
        rebalance_plan: Some(plan),
        filled_orders: execution_result.filled_orders,
        orders_canceled: execution_result.orders_canceled,
        warnings,
        error: if success {
            None
        } else if execution_result.circuit_breaker_tripped {
            Some(ErrorReport {
                code: "DAILY_TRADE_LIMIT_EXCEEDED".to_string(),
                message: "daily trade-value circuit breaker tripped; remaining submissions were refused".to_string(),
                exit_code: 2,
            })
        } else {
            Some(ErrorReport {
                code: "EXECUTION_INCOMPLETE".to_string(),
                message: "one or more intended orders did not reach a terminal state".to_string(),
                exit_code: 1,
            })
        },
    }
}

fn failed_result(
    correlation_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    signals: Vec<quant_strategy::StrategySignal>,
    err: EngineError,
    warnings: Vec<String>,
) -> TradeRunResult {
    TradeRunResult {
        success: false,
        correlation_id,
        started_at,
        completed_at: Utc::now(),
        signals_by_strategy: signals,
        consolidated_portfolio: None,
        rebalance_plan: None,
        filled_orders: Vec::new(),
        orders_canceled: 0,
        warnings,
        error: Some(ErrorReport::from(&err)),
    }
}

impl TradeRunResult {
    fn with_consolidated(mut self, consolidated: quant_strategy::ConsolidatedPortfolio) -> Self {
        self.consolidated_portfolio = Some(consolidated);
        self
    }
}
