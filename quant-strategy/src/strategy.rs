use crate::error::StrategyError;
use crate::signal::StrategySignal;
use async_trait::async_trait;
use indexmap::IndexMap;
use quant_instrument::{PortfolioSnapshot, StrategyId};
use std::sync::Arc;

/// One independently-developed trading strategy. Implementations are stateless across runs:
/// all state a strategy needs to decide its signals comes from the `snapshot` it is given.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn id(&self) -> &StrategyId;

    /// Produce this run's signals. A strategy that cannot evaluate (missing data, a computed
    /// indicator failing to converge) returns `Err` rather than guessing; the caller is
    /// responsible for deciding whether that failure sidelines just this strategy or aborts
    /// the run.
    async fn evaluate(&self, snapshot: &PortfolioSnapshot) -> Result<Vec<StrategySignal>, StrategyError>;
}

/// Strategies are registered by name at startup rather than modelled as a closed Rust enum, so
/// that adding one is a registration call instead of a recompile of every exhaustive match
/// downstream of [`StrategyId`].
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: IndexMap<StrategyId, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self { strategies: IndexMap::new() }
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.id().clone(), strategy);
    }

    pub fn get(&self, id: &StrategyId) -> Option<&Arc<dyn Strategy>> {
        self.strategies.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyId, &Arc<dyn Strategy>)> {
        self.strategies.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }
}
