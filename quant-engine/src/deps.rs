use quant_execution::{AccountPort, MarketDataPort};
use quant_risk::DailyTradeLimitState;
use quant_strategy::StrategyRegistry;
use quant_tracker::StrategyTracker;
use std::sync::Arc;

/// An optional fire-and-forget observer, the documented seam for callers who want to keep
/// publishing events without the core depending on a pub/sub bus (§9's "event bus" redesign
/// note: `run()` returns a value; this hook is never required).
pub trait EngineEvent: std::fmt::Debug + Send + Sync {}

pub type EventHook = Arc<dyn Fn(&dyn EngineEvent) + Send + Sync>;

/// Every dependency object a single `run()` call needs, built once at startup and threaded
/// through explicitly — no global singletons, no `lazy_static`/`OnceCell` (§9).
pub struct EngineDeps {
    pub account: Arc<dyn AccountPort>,
    pub market: Arc<dyn MarketDataPort>,
    pub strategies: Arc<StrategyRegistry>,
    pub daily_limit: Arc<DailyTradeLimitState>,
    pub tracker: Arc<StrategyTracker>,
    pub on_event: Option<EventHook>,
}

impl EngineDeps {
    pub fn new(
        account: Arc<dyn AccountPort>,
        market: Arc<dyn MarketDataPort>,
        strategies: Arc<StrategyRegistry>,
        daily_limit: Arc<DailyTradeLimitState>,
        tracker: Arc<StrategyTracker>,
    ) -> Self {
        Self { account, market, strategies, daily_limit, tracker, on_event: None }
    }

    pub fn with_event_hook(mut self, hook: EventHook) -> Self {
        self.on_event = Some(hook);
        self
    }
}
