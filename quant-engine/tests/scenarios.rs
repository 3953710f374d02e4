//! End-to-end pipeline scenarios: each test drives `quant_engine::run` through a full
//! Signal Aggregator -> Rebalance Planner -> Execution Engine -> Strategy Tracker pass against
//! the in-process mock ports, the way the teacher's workspace exercises its own client against
//! a mock transport.

use async_trait::async_trait;
use quant_engine::{EngineConfig, EngineDeps};
use quant_execution::testing::{flat_margin_info, long_position, MockAccountPort, MockMarketDataPort, ScriptedFill};
use quant_execution::{AccountSnapshot, OrderState};
use quant_instrument::{PortfolioSnapshot, StrategyId, Symbol};
use quant_risk::DailyTradeLimitState;
use quant_strategy::{Action, Strategy, StrategyError, StrategyRegistry, StrategySignal};
use quant_tracker::{InMemoryObjectStore, StrategyTracker};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

/// A strategy that always returns the same fixed set of signals, regardless of the snapshot —
/// enough to drive a pipeline run deterministically without a real strategy DSL.
struct FixedStrategy {
    id: StrategyId,
    signals: Vec<StrategySignal>,
}

#[async_trait]
impl Strategy for FixedStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    async fn evaluate(&self, _snapshot: &PortfolioSnapshot) -> Result<Vec<StrategySignal>, StrategyError> {
        Ok(self.signals.clone())
    }
}

fn signal(strategy: &str, symbol: &str, action: Action, alloc: Decimal) -> StrategySignal {
    StrategySignal::new(sym(symbol), action, dec!(0.8), alloc, "test", StrategyId::new(strategy), chrono::Utc::now())
        .unwrap()
}

fn base_config(daily_trade_limit_usd: Decimal) -> EngineConfig {
    let mut weights = std::collections::HashMap::new();
    weights.insert(StrategyId::new("NUCLEAR"), dec!(1.0));
    let mut config = EngineConfig::paper_defaults(weights, daily_trade_limit_usd);
    // These scenarios exercise single-strategy concentration above the 30% default cap; the
    // cap itself is covered by `quant-risk`'s own `clamps_target_weight_at_position_cap` test.
    config.max_position_weight_cap = dec!(1.0);
    config
}

fn tracker() -> Arc<StrategyTracker> {
    Arc::new(StrategyTracker::new(Arc::new(InMemoryObjectStore::new()), "test".to_string(), 100))
}

/// S1. No-op day: the portfolio is already parked entirely in the cash proxy, every strategy
/// returns HOLD, and nothing should trade.
#[tokio::test]
async fn s1_no_op_day_produces_a_single_hold_item() {
    let account = Arc::new(MockAccountPort::new(AccountSnapshot {
        total_value: dec!(10000),
        cash: dec!(0),
        equity: dec!(10000),
        margin_info: flat_margin_info(dec!(10000)),
    }));
    account.push_position(long_position(sym("BIL"), dec!(100), dec!(100)));

    let market = Arc::new(MockMarketDataPort::new());
    market.set_price(sym("BIL"), dec!(100));

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(FixedStrategy {
        id: StrategyId::new("NUCLEAR"),
        signals: vec![signal("NUCLEAR", "BIL", Action::Hold, Decimal::ZERO)],
    }));

    let daily_limit = Arc::new(DailyTradeLimitState::new(dec!(25000)));
    let deps = EngineDeps::new(account.clone(), market, Arc::new(registry), daily_limit.clone(), tracker());

    let result = quant_engine::run(&deps, &base_config(dec!(25000)), None).await;

    assert!(result.success, "errors: {:?}", result.error);
    let plan = result.rebalance_plan.expect("plan");
    assert_eq!(plan.items.len(), 1);
    assert_eq!(plan.items[0].action, quant_risk::PlanAction::Hold);
    assert!(account.submitted.lock().is_empty());
    assert!(result.filled_orders.is_empty());
    assert_eq!(daily_limit.cumulative_value(), Decimal::ZERO);
}

/// S2. Fresh allocation from all cash into two symbols.
#[tokio::test]
async fn s2_fresh_allocation_buys_both_symbols_and_records_fills() {
    let account = Arc::new(MockAccountPort::new(AccountSnapshot {
        total_value: dec!(10000),
        cash: dec!(10000),
        equity: dec!(10000),
        margin_info: flat_margin_info(dec!(10000)),
    }));

    let market = Arc::new(MockMarketDataPort::new());
    market.set_price(sym("AAPL"), dec!(150));
    market.set_price(sym("MSFT"), dec!(300));
    market.set_fractionable(sym("MSFT"), true);

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(FixedStrategy {
        id: StrategyId::new("NUCLEAR"),
        signals: vec![
            signal("NUCLEAR", "AAPL", Action::Buy, dec!(0.6)),
            signal("NUCLEAR", "MSFT", Action::Buy, dec!(0.4)),
        ],
    }));

    let daily_limit = Arc::new(DailyTradeLimitState::new(dec!(25000)));
    let tracker = tracker();
    let deps = EngineDeps::new(account.clone(), market, Arc::new(registry), daily_limit, tracker.clone());

    // AAPL is non-fractionable by default: $6,000 / $150 = 40 whole shares, no notional
    // fallback needed. MSFT is fractionable: $4,000 / $300 = 13.333333 shares.
    account.script_fill("mock-1", ScriptedFill { state: OrderState::Filled, filled_quantity: dec!(40), filled_avg_price: dec!(150) });
    account.script_fill(
        "mock-2",
        ScriptedFill { state: OrderState::Filled, filled_quantity: dec!(13.333333), filled_avg_price: dec!(300) },
    );

    let result = quant_engine::run(&deps, &base_config(dec!(25000)), None).await;

    assert!(result.success, "errors: {:?}", result.error);
    let plan = result.rebalance_plan.expect("plan");
    assert_eq!(plan.items.len(), 2);
    assert!(plan.items.iter().all(|i| i.action == quant_risk::PlanAction::Buy));
    assert_eq!(
        plan.items.iter().find(|i| i.symbol == sym("AAPL")).unwrap().trade_amount,
        dec!(6000)
    );
    assert_eq!(
        plan.items.iter().find(|i| i.symbol == sym("MSFT")).unwrap().trade_amount,
        dec!(4000)
    );

    let pnl = tracker.get_strategy_pnl(&StrategyId::new("NUCLEAR"), &Default::default());
    let aapl = pnl.positions.iter().find(|p| p.symbol == sym("AAPL")).expect("AAPL position");
    assert_eq!(aapl.quantity, dec!(40));
    assert_eq!(aapl.average_cost, dec!(150));
    let msft = pnl.positions.iter().find(|p| p.symbol == sym("MSFT")).expect("MSFT position");
    assert_eq!(msft.quantity, dec!(13.333333));
    assert_eq!(msft.average_cost, dec!(300));
}

/// S3. Rebalance with sell-first: an existing position is partially trimmed to fund a new buy.
/// (A full liquidation down to zero is exercised directly against `ExecutionEngine` in
/// `quant-execution`'s own test suite, where the broker's dedicated liquidate primitive is used
/// instead of a priced sell order.)
#[tokio::test]
async fn s3_sell_settles_before_buy_is_submitted() {
    let account = Arc::new(MockAccountPort::new(AccountSnapshot {
        total_value: dec!(10000),
        cash: dec!(1000),
        equity: dec!(10000),
        margin_info: flat_margin_info(dec!(10000)),
    }));
    account.push_position(long_position(sym("SPY"), dec!(20), dec!(300)));

    let market = Arc::new(MockMarketDataPort::new());
    market.set_price(sym("SPY"), dec!(300));
    market.set_price(sym("QQQ"), dec!(400));
    market.set_fractionable(sym("QQQ"), true);

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(FixedStrategy {
        id: StrategyId::new("NUCLEAR"),
        signals: vec![
            signal("NUCLEAR", "SPY", Action::Buy, dec!(0.3)),
            signal("NUCLEAR", "QQQ", Action::Buy, dec!(0.7)),
        ],
    }));

    let daily_limit = Arc::new(DailyTradeLimitState::new(dec!(25000)));
    let tracker = tracker();
    let deps = EngineDeps::new(account.clone(), market, Arc::new(registry), daily_limit, tracker.clone());

    // SPY trims from $6,000 to $3,000 (10 shares at $300), QQQ buys $7,000 (17.5 shares).
    account.script_fill("mock-1", ScriptedFill { state: OrderState::Filled, filled_quantity: dec!(10), filled_avg_price: dec!(300) });
    account.script_fill("mock-2", ScriptedFill { state: OrderState::Filled, filled_quantity: dec!(17.5), filled_avg_price: dec!(400) });

    let result = quant_engine::run(&deps, &base_config(dec!(25000)), None).await;

    assert!(result.success, "errors: {:?}", result.error);
    let plan = result.rebalance_plan.expect("plan");
    assert_eq!(plan.items[0].symbol, sym("SPY"));
    assert_eq!(plan.items[0].action, quant_risk::PlanAction::Sell);
    assert_eq!(plan.items[1].symbol, sym("QQQ"));
    assert_eq!(plan.items[1].action, quant_risk::PlanAction::Buy);

    let submitted = account.submitted.lock();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].side, quant_execution::OrderSide::Sell);
    assert_eq!(submitted[1].side, quant_execution::OrderSide::Buy);
    drop(submitted);

    assert_eq!(result.filled_orders.len(), 2);
    assert_eq!(result.filled_orders[0].symbol, sym("SPY"));
    assert_eq!(result.filled_orders[1].symbol, sym("QQQ"));
}

/// S4. Circuit breaker trip: two buys each fit under the daily limit individually, but not
/// combined, and the run must stop after the first.
#[tokio::test]
async fn s4_circuit_breaker_trip_stops_after_first_buy() {
    let account = Arc::new(MockAccountPort::new(AccountSnapshot {
        total_value: dec!(10000),
        cash: dec!(10000),
        equity: dec!(10000),
        margin_info: flat_margin_info(dec!(10000)),
    }));

    let market = Arc::new(MockMarketDataPort::new());
    market.set_price(sym("AAPL"), dec!(150));
    market.set_price(sym("MSFT"), dec!(300));
    market.set_fractionable(sym("AAPL"), true);
    market.set_fractionable(sym("MSFT"), true);

    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(FixedStrategy {
        id: StrategyId::new("NUCLEAR"),
        signals: vec![
            signal("NUCLEAR", "AAPL", Action::Buy, dec!(0.3)),
            signal("NUCLEAR", "MSFT", Action::Buy, dec!(0.3)),
        ],
    }));

    let daily_limit = Arc::new(DailyTradeLimitState::new(dec!(5000)));
    let tracker = tracker();
    let deps = EngineDeps::new(account.clone(), market, Arc::new(registry), daily_limit.clone(), tracker.clone());

    account.script_fill("mock-1", ScriptedFill { state: OrderState::Filled, filled_quantity: dec!(20), filled_avg_price: dec!(150) });

    let result = quant_engine::run(&deps, &base_config(dec!(5000)), None).await;

    assert!(!result.success);
    assert_eq!(result.exit_code(), 2, "circuit-breaker trips must report spec.md's exit code 2");
    assert_eq!(result.error.as_ref().unwrap().code, "DAILY_TRADE_LIMIT_EXCEEDED");
    assert_eq!(account.submitted.lock().len(), 1, "only the first BUY should have been submitted");
    assert_eq!(result.filled_orders.len(), 1);
    assert_eq!(daily_limit.cumulative_value(), dec!(3000));

    let order_history = tracker.get_order_history(Some(&StrategyId::new("NUCLEAR")), None, None);
    assert_eq!(order_history.len(), 1);
}
