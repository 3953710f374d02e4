use crate::portfolio::ConsolidatedPortfolio;
use crate::signal::{Action, StrategySignal};
use indexmap::IndexMap;
use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use tracing::warn;

/// Non-fatal observations raised while building a [`ConsolidatedPortfolio`]. Every one of these
/// is logged and the run continues — only the Planner enforces hard failures.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateWarning {
    InvalidSignal { strategy_id: StrategyId, symbol: Symbol, reason: String },
    MissingStrategyWeight { strategy_id: StrategyId },
    WeightSumOutOfTolerance { total: Decimal },
}

/// Consolidate per-strategy signals into a single target-weight vector.
///
/// `signals_by_strategy` and `strategy_weights` are `IndexMap`s so that the iteration order —
/// and therefore "first strategy in insertion order" primary-strategy attribution — is under
/// the caller's control rather than incidental to a hash implementation.
pub fn aggregate(
    signals_by_strategy: &IndexMap<StrategyId, Vec<StrategySignal>>,
    strategy_weights: &IndexMap<StrategyId, Decimal>,
    cash_proxy_symbol: &Symbol,
    portfolio_sentinel: Option<&Symbol>,
) -> (ConsolidatedPortfolio, Vec<AggregateWarning>) {
    let mut weights: IndexMap<Symbol, Decimal> = IndexMap::new();
    let mut contributing_strategies: IndexMap<Symbol, Vec<StrategyId>> = IndexMap::new();
    let mut warnings = Vec::new();

    for (strategy_id, signals) in signals_by_strategy {
        let Some(&strategy_weight) = strategy_weights.get(strategy_id) else {
            warnings.push(AggregateWarning::MissingStrategyWeight { strategy_id: strategy_id.clone() });
            continue;
        };

        for signal in signals {
            if portfolio_sentinel.is_some_and(|sentinel| sentinel == &signal.symbol) {
                continue;
            }

            if !(Decimal::ZERO..=Decimal::ONE).contains(&signal.confidence)
                || !(Decimal::ZERO..=Decimal::ONE).contains(&signal.target_allocation)
            {
                warnings.push(AggregateWarning::InvalidSignal {
                    strategy_id: strategy_id.clone(),
                    symbol: signal.symbol.clone(),
                    reason: "confidence or target_allocation outside [0, 1]".to_string(),
                });
                continue;
            }

            match signal.action {
                Action::Buy => {
                    let contribution = signal.target_allocation * strategy_weight;
                    *weights.entry(signal.symbol.clone()).or_insert(Decimal::ZERO) += contribution;
                    let contributors = contributing_strategies.entry(signal.symbol.clone()).or_default();
                    if !contributors.contains(strategy_id) {
                        contributors.push(strategy_id.clone());
                    }
                }
                // SELL implies "not in target" and contributes nothing; a symbol with only
                // SELL signals is simply absent from `weights`, so the Planner liquidates it.
                Action::Sell => {}
                // HOLD is informational only.
                Action::Hold => {}
            }
        }
    }

    if weights.is_empty() {
        warn!(
            cash_proxy = cash_proxy_symbol.as_str(),
            "no BUY signals from any strategy, falling back to defensive cash allocation"
        );
        weights.insert(cash_proxy_symbol.clone(), Decimal::ONE);
        contributing_strategies.clear();
    } else {
        let total: Decimal = weights.values().copied().sum();
        if !(Decimal::new(99, 2)..=Decimal::new(101, 2)).contains(&total) {
            warnings.push(AggregateWarning::WeightSumOutOfTolerance { total });
        }
    }

    (ConsolidatedPortfolio { weights, contributing_strategies }, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    fn signal(strategy: &str, symbol: &str, action: Action, alloc: Decimal) -> StrategySignal {
        StrategySignal::new(
            sym(symbol),
            action,
            dec!(0.8),
            alloc,
            "test",
            StrategyId::new(strategy),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn sums_contributions_from_multiple_strategies() {
        let mut signals = IndexMap::new();
        signals.insert(
            StrategyId::new("NUCLEAR"),
            vec![signal("NUCLEAR", "AAPL", Action::Buy, dec!(0.5))],
        );
        signals.insert(
            StrategyId::new("TECL"),
            vec![signal("TECL", "AAPL", Action::Buy, dec!(1.0))],
        );
        let mut weights = IndexMap::new();
        weights.insert(StrategyId::new("NUCLEAR"), dec!(0.6));
        weights.insert(StrategyId::new("TECL"), dec!(0.4));

        let (portfolio, warnings) = aggregate(&signals, &weights, &sym("BIL"), None);

        assert!(warnings.is_empty());
        assert_eq!(portfolio.weights[&sym("AAPL")], dec!(0.5) * dec!(0.6) + dec!(1.0) * dec!(0.4));
        assert_eq!(
            portfolio.contributing_strategies[&sym("AAPL")],
            vec![StrategyId::new("NUCLEAR"), StrategyId::new("TECL")]
        );
    }

    #[test]
    fn sell_only_symbol_is_omitted() {
        let mut signals = IndexMap::new();
        signals.insert(
            StrategyId::new("NUCLEAR"),
            vec![signal("NUCLEAR", "SPY", Action::Sell, Decimal::ZERO)],
        );
        let mut weights = IndexMap::new();
        weights.insert(StrategyId::new("NUCLEAR"), dec!(1.0));

        let (portfolio, _) = aggregate(&signals, &weights, &sym("BIL"), None);

        // no BUY signals at all -> defensive cash fallback
        assert_eq!(portfolio.weights.len(), 1);
        assert_eq!(portfolio.weights[&sym("BIL")], Decimal::ONE);
    }

    #[test]
    fn no_buy_signals_falls_back_to_cash_proxy() {
        let signals = IndexMap::new();
        let weights = IndexMap::new();

        let (portfolio, _) = aggregate(&signals, &weights, &sym("BIL"), None);

        assert_eq!(portfolio.weights.get(&sym("BIL")), Some(&Decimal::ONE));
    }

    #[test]
    fn excludes_portfolio_sentinel() {
        let mut signals = IndexMap::new();
        signals.insert(
            StrategyId::new("NUCLEAR"),
            vec![signal("NUCLEAR", "PORT", Action::Buy, dec!(1.0))],
        );
        let mut weights = IndexMap::new();
        weights.insert(StrategyId::new("NUCLEAR"), dec!(1.0));

        let (portfolio, _) = aggregate(&signals, &weights, &sym("BIL"), Some(&sym("PORT")));

        assert_eq!(portfolio.weights.get(&sym("BIL")), Some(&Decimal::ONE));
    }
}
