use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::plan::{PlanAction, RebalancePlan, RebalancePlanItem};
use indexmap::IndexSet;
use quant_instrument::{money::round_half_up_cents, ExecutionUrgency, PortfolioSnapshot, StrategyId, Symbol};
use quant_strategy::ConsolidatedPortfolio;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Derive an overall urgency for the plan from its most time-sensitive item: the largest
/// dollar trade (priority 1) drives urgent pricing for the whole plan, since it carries the
/// most opportunity-cost risk if left unfilled.
fn execution_urgency_for(items: &[RebalancePlanItem]) -> ExecutionUrgency {
    let highest_priority = items
        .iter()
        .filter(|item| !matches!(item.action, PlanAction::Hold))
        .map(|item| item.priority)
        .min();

    match highest_priority {
        Some(1) => ExecutionUrgency::Urgent,
        Some(2) => ExecutionUrgency::High,
        Some(_) => ExecutionUrgency::Normal,
        None => ExecutionUrgency::Low,
    }
}

const TOLERANCE: Decimal = dec!(0.01);
const PRIORITY_THRESHOLD_10K: Decimal = dec!(10000);
const PRIORITY_THRESHOLD_1K: Decimal = dec!(1000);
const PRIORITY_THRESHOLD_100: Decimal = dec!(100);
const PRIORITY_THRESHOLD_50: Decimal = dec!(50);

fn priority_for(trade_amount_abs: Decimal) -> u8 {
    if trade_amount_abs >= PRIORITY_THRESHOLD_10K {
        1
    } else if trade_amount_abs >= PRIORITY_THRESHOLD_1K {
        2
    } else if trade_amount_abs >= PRIORITY_THRESHOLD_100 {
        3
    } else if trade_amount_abs >= PRIORITY_THRESHOLD_50 {
        4
    } else {
        5
    }
}

/// Turn a consolidated, cross-strategy target-weight vector into an ordered set of trades,
/// under capital, leverage and minimum-trade-size constraints.
///
/// Operates purely on the already-consolidated view: it has no notion of which strategy
/// "owns" a position beyond the attribution tag carried for P&L purposes, so a SELL driven by
/// one strategy dropping a symbol that another strategy still wants nets out before any order
/// is placed, rather than fighting itself with an offsetting BUY.
pub fn build_plan(
    consolidated: &ConsolidatedPortfolio,
    snapshot: &PortfolioSnapshot,
    config: &PlannerConfig,
    correlation_id: Uuid,
) -> Result<RebalancePlan, PlannerError> {
    // Step 1 — weight validation.
    let total_weight = consolidated.total_weight();
    if total_weight > dec!(1.01) {
        return Err(PlannerError::InvalidPortfolio { total: total_weight });
    }
    if total_weight < dec!(0.99) {
        tracing::warn!(total = %total_weight, "consolidated target weights sum to less than 0.99");
    }

    // Step 1b — position concentration cap. A single symbol's target weight is clamped to
    // `max_position_weight_cap` regardless of what the aggregator produced; clamped capital is
    // simply left undeployed rather than redistributed, so the sum-to-1 check above is allowed
    // to read low afterwards.
    let mut capped_weights = consolidated.weights.clone();
    for (symbol, weight) in capped_weights.iter_mut() {
        if *weight > config.max_position_weight_cap {
            tracing::warn!(
                %symbol,
                weight = %*weight,
                cap = %config.max_position_weight_cap,
                "target weight exceeds max position weight cap, clamping"
            );
            *weight = config.max_position_weight_cap;
        }
    }

    // Step 2 — deployable capital.
    let equity = snapshot.total_value;
    let mut deployable = equity * config.equity_deployment_pct;

    if deployable > equity {
        let margin_info = snapshot.margin_info.as_ref().ok_or(PlannerError::InsufficientMarginData)?;

        if margin_info.margin_utilization_pct > config.margin_utilization_ceiling_pct {
            return Err(PlannerError::MarginSafety {
                reason: format!(
                    "margin utilization {} exceeds ceiling {}",
                    margin_info.margin_utilization_pct, config.margin_utilization_ceiling_pct
                ),
            });
        }
        if margin_info.maintenance_buffer_pct < config.maintenance_buffer_floor_pct {
            return Err(PlannerError::MarginSafety {
                reason: format!(
                    "maintenance buffer {} is below floor {}",
                    margin_info.maintenance_buffer_pct, config.maintenance_buffer_floor_pct
                ),
            });
        }

        if config.leverage_enabled {
            deployable = deployable.min(margin_info.deployable_buying_power());
        }
    }

    // Step 3 — target and current dollar values, over the union of target and current symbols.
    let mut symbols: IndexSet<Symbol> = IndexSet::new();
    for symbol in capped_weights.keys() {
        symbols.insert(symbol.clone());
    }
    for symbol in snapshot.positions.keys() {
        symbols.insert(symbol.clone());
    }

    let mut current_values = indexmap::IndexMap::new();
    let mut target_values = indexmap::IndexMap::new();

    for symbol in &symbols {
        let qty = snapshot.quantity_of(symbol);
        let price = snapshot.price_of(symbol).unwrap_or(Decimal::ZERO);
        if qty > Decimal::ZERO && price <= Decimal::ZERO {
            return Err(PlannerError::MissingPrice { symbol: symbol.clone() });
        }
        current_values.insert(symbol.clone(), qty * price);

        let weight = capped_weights.get(symbol).copied().unwrap_or(Decimal::ZERO);
        target_values.insert(symbol.clone(), weight * deployable);
    }

    // Step 4 — capital feasibility.
    let buys: Decimal = symbols
        .iter()
        .map(|s| (target_values[s] - current_values[s]).max(Decimal::ZERO))
        .sum();
    let sell_proceeds: Decimal = symbols
        .iter()
        .map(|s| (current_values[s] - target_values[s]).max(Decimal::ZERO))
        .sum();

    if config.leverage_enabled {
        let net_buy_needed = buys - sell_proceeds;
        let available = snapshot
            .margin_info
            .as_ref()
            .map(|m| m.deployable_buying_power())
            .unwrap_or(Decimal::ZERO);
        if net_buy_needed > available + TOLERANCE {
            return Err(PlannerError::InsufficientCapital {
                needed: net_buy_needed,
                available,
                deficit: net_buy_needed - available,
            });
        }
    } else {
        let available = snapshot.cash + sell_proceeds;
        if buys > available + TOLERANCE {
            return Err(PlannerError::InsufficientCapital {
                needed: buys,
                available,
                deficit: buys - available,
            });
        }
    }

    // Step 5 — per-symbol items.
    let portfolio_value_basis = {
        let sum_current: Decimal = current_values.values().copied().sum();
        let sum_target: Decimal = target_values.values().copied().sum();
        sum_current.max(sum_target)
    };

    let mut items = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let current = current_values[symbol];
        let target = target_values[symbol];
        let trade_amount = target - current;
        let action = match trade_amount.cmp(&Decimal::ZERO) {
            std::cmp::Ordering::Greater => PlanAction::Buy,
            std::cmp::Ordering::Less => PlanAction::Sell,
            std::cmp::Ordering::Equal => PlanAction::Hold,
        };
        let current_weight = if portfolio_value_basis == Decimal::ZERO {
            Decimal::ZERO
        } else {
            current / portfolio_value_basis
        };
        let target_weight = capped_weights.get(symbol).copied().unwrap_or(Decimal::ZERO);
        let priority = priority_for(trade_amount.abs());
        let strategy_id = consolidated
            .primary_strategy(symbol)
            .cloned()
            .unwrap_or_else(|| config.default_strategy_id.clone());

        items.push(RebalancePlanItem {
            symbol: symbol.clone(),
            action,
            trade_amount,
            current_value: current,
            target_value: target,
            current_weight,
            target_weight,
            priority,
            strategy_id,
        });
    }

    // Step 6 — minimum-trade suppression.
    let min_trade_threshold = if portfolio_value_basis < PRIORITY_THRESHOLD_1K {
        round_half_up_cents(portfolio_value_basis * dec!(0.01))
    } else {
        config.min_trade_amount_usd
    };

    for item in &mut items {
        if !matches!(item.action, PlanAction::Hold) && item.trade_amount.abs() < min_trade_threshold {
            item.action = PlanAction::Hold;
            item.trade_amount = Decimal::ZERO;
        }
    }

    // Step 7 — ordering: SELLs before BUYs, descending priority within each group. HOLDs sort last.
    items.sort_by(|a, b| {
        let group = |item: &RebalancePlanItem| match item.action {
            PlanAction::Sell => 0,
            PlanAction::Buy => 1,
            PlanAction::Hold => 2,
        };
        group(a).cmp(&group(b)).then(a.priority.cmp(&b.priority))
    });

    // Step 8 — degenerate result.
    let tradeable = items.iter().any(|item| !matches!(item.action, PlanAction::Hold));
    if !tradeable {
        let fallback_symbol = consolidated
            .weights
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| config.cash_proxy_symbol.clone());
        items = vec![RebalancePlanItem {
            symbol: fallback_symbol,
            action: PlanAction::Hold,
            trade_amount: Decimal::ZERO,
            current_value: Decimal::ZERO,
            target_value: Decimal::ZERO,
            current_weight: Decimal::ZERO,
            target_weight: Decimal::ZERO,
            priority: 5,
            strategy_id: config.default_strategy_id.clone(),
        }];
    }

    let total_trade_value: Decimal = items.iter().map(|item| item.trade_amount.abs()).sum();
    let execution_urgency = execution_urgency_for(&items);
    let timestamp = chrono::Utc::now();

    Ok(RebalancePlan {
        plan_id: format!("rebalance_{correlation_id}_{}", timestamp.timestamp()),
        correlation_id,
        causation_id: correlation_id,
        timestamp,
        items,
        total_portfolio_value: portfolio_value_basis,
        total_trade_value,
        max_drift_tolerance: config.max_drift_tolerance,
        execution_urgency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    fn config() -> PlannerConfig {
        PlannerConfig {
            equity_deployment_pct: dec!(1.0),
            leverage_enabled: false,
            margin_utilization_ceiling_pct: dec!(0.8),
            maintenance_buffer_floor_pct: dec!(0.1),
            max_position_weight_cap: dec!(0.3),
            min_trade_amount_usd: dec!(50),
            default_strategy_id: StrategyId::new("DEFAULT"),
            cash_proxy_symbol: sym("BIL"),
            max_drift_tolerance: dec!(0.05),
        }
    }

    fn consolidated(weights: &[(&str, Decimal)]) -> ConsolidatedPortfolio {
        let mut w = IndexMap::new();
        let mut contributors = IndexMap::new();
        for (symbol, weight) in weights {
            w.insert(sym(symbol), *weight);
            contributors.insert(sym(symbol), vec![StrategyId::new("NUCLEAR")]);
        }
        ConsolidatedPortfolio { weights: w, contributing_strategies: contributors }
    }

    #[test]
    fn buy_only_from_all_cash() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(10000),
            IndexMap::new(),
            IndexMap::from([(sym("AAPL"), dec!(150))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(1.0))]);

        let plan = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].action, PlanAction::Buy);
        assert_eq!(plan.items[0].trade_amount, dec!(10000));
    }

    #[test]
    fn sells_ordered_before_buys() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(0),
            IndexMap::from([(sym("MSFT"), dec!(20))]),
            IndexMap::from([(sym("MSFT"), dec!(300)), (sym("AAPL"), dec!(150))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(1.0))]);

        let plan = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap();

        assert_eq!(plan.items[0].symbol, sym("MSFT"));
        assert_eq!(plan.items[0].action, PlanAction::Sell);
        assert_eq!(plan.items[1].symbol, sym("AAPL"));
        assert_eq!(plan.items[1].action, PlanAction::Buy);
    }

    #[test]
    fn suppresses_dust_trades_below_threshold() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(10000),
            IndexMap::new(),
            IndexMap::from([(sym("AAPL"), dec!(150)), (sym("MSFT"), dec!(300))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(0.995)), ("MSFT", dec!(0.001))]);

        let plan = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap();

        let msft = plan.items.iter().find(|i| i.symbol == sym("MSFT")).unwrap();
        assert_eq!(msft.action, PlanAction::Hold);
        assert_eq!(msft.trade_amount, Decimal::ZERO);
    }

    #[test]
    fn rejects_weights_exceeding_tolerance() {
        let snapshot = PortfolioSnapshot::new(dec!(10000), dec!(10000), IndexMap::new(), IndexMap::new(), None)
            .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(1.5))]);

        let err = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPortfolio { .. }));
    }

    #[test]
    fn insufficient_cash_fails_with_deficit() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(100),
            IndexMap::new(),
            IndexMap::from([(sym("AAPL"), dec!(150))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(1.0))]);

        let err = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap_err();
        match err {
            PlannerError::InsufficientCapital { deficit, .. } => assert_eq!(deficit, dec!(9900)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn degenerate_all_hold_plan_has_single_item() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(0),
            IndexMap::from([(sym("AAPL"), dec!(66))]),
            IndexMap::from([(sym("AAPL"), dec!(150))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(1.0))]);

        let plan = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].action, PlanAction::Hold);
    }

    #[test]
    fn clamps_target_weight_at_position_cap() {
        let snapshot = PortfolioSnapshot::new(
            dec!(10000),
            dec!(10000),
            IndexMap::new(),
            IndexMap::from([(sym("AAPL"), dec!(150)), (sym("MSFT"), dec!(300))]),
            None,
        )
        .unwrap();
        let portfolio = consolidated(&[("AAPL", dec!(0.7)), ("MSFT", dec!(0.3))]);

        let plan = build_plan(&portfolio, &snapshot, &config(), Uuid::nil()).unwrap();

        let aapl = plan.items.iter().find(|i| i.symbol == sym("AAPL")).unwrap();
        assert_eq!(aapl.target_weight, dec!(0.3));
        assert_eq!(aapl.target_value, dec!(3000));
    }
}
