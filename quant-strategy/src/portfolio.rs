use quant_instrument::{StrategyId, Symbol};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The output of the Signal Aggregator: a consolidated symbol -> weight vector plus per-symbol
/// strategy attribution, built once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidatedPortfolio {
    pub weights: IndexMap<Symbol, Decimal>,
    pub contributing_strategies: IndexMap<Symbol, Vec<StrategyId>>,
}

impl ConsolidatedPortfolio {
    pub fn total_weight(&self) -> Decimal {
        self.weights.values().copied().sum()
    }

    /// The strategy attributed with a symbol's trade, for P&L tagging: the lexicographically
    /// smallest `StrategyId` among that symbol's contributors.
    ///
    /// "First in iteration order" is non-deterministic under some map types, so ties break
    /// deterministically on the minimum `StrategyId` rather than relying on callers to hand
    /// `contributing_strategies` to us in a particular order.
    pub fn primary_strategy(&self, symbol: &Symbol) -> Option<&StrategyId> {
        self.contributing_strategies.get(symbol).and_then(|contributors| contributors.iter().min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    #[test]
    fn primary_strategy_picks_lexicographically_smallest_contributor_regardless_of_order() {
        let mut contributing_strategies = IndexMap::new();
        contributing_strategies.insert(sym("AAPL"), vec![StrategyId::new("TECL"), StrategyId::new("KLM"), StrategyId::new("NUCLEAR")]);
        let portfolio = ConsolidatedPortfolio { weights: IndexMap::new(), contributing_strategies };

        assert_eq!(portfolio.primary_strategy(&sym("AAPL")), Some(&StrategyId::new("KLM")));
    }

    #[test]
    fn primary_strategy_is_none_for_an_uncontributed_symbol() {
        let portfolio = ConsolidatedPortfolio::default();
        assert_eq!(portfolio.primary_strategy(&sym("AAPL")), None);
    }
}
