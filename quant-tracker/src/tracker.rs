use crate::persistence::{
    current_positions_path, daily_archive_path, realized_pnl_path, recent_orders_path, ObjectStore,
};
use crate::pnl::StrategyPnL;
use crate::position::{OrderRecord, Side, StrategyPosition};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct TrackerState {
    positions: IndexMap<(StrategyId, Symbol), StrategyPosition>,
    realized_pnl: IndexMap<StrategyId, Decimal>,
    recent_orders: VecDeque<OrderRecord>,
}

/// Durable, per-deployment-mode store of every strategy's positions, cost basis and realized
/// P&L. Mutations are serialized behind a single mutex and followed by a persistence write, so
/// a crash leaves state correct up to the last successfully persisted mutation.
pub struct StrategyTracker {
    state: Mutex<TrackerState>,
    store: Arc<dyn ObjectStore>,
    prefix: String,
    order_history_limit: usize,
}

impl StrategyTracker {
    /// Build a tracker with empty in-memory state. Call [`StrategyTracker::load`] to hydrate
    /// it from the object store before first use.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>, order_history_limit: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            store,
            prefix: prefix.into(),
            order_history_limit,
        }
    }

    /// Hydrate in-memory state from the three persisted documents. A parse failure on any one
    /// of them falls back to an empty structure for that document and logs a recoverable
    /// warning — it never fails the run, matching the original's per-file try/except loader.
    pub async fn load(&self) {
        let mut state = TrackerState::default();

        match self.store.get_json(&current_positions_path(&self.prefix)).await {
            Ok(Some(value)) => match serde_json::from_value::<PositionsDocument>(value) {
                Ok(doc) => {
                    for position in doc.positions {
                        state.positions.insert((position.strategy_id.clone(), position.symbol.clone()), position);
                    }
                }
                Err(err) => tracing::warn!(error = %err, "current_positions.json failed to parse, starting empty"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read current_positions.json, starting empty"),
        }

        match self.store.get_json(&realized_pnl_path(&self.prefix)).await {
            Ok(Some(value)) => match serde_json::from_value::<IndexMap<StrategyId, Decimal>>(value) {
                Ok(map) => state.realized_pnl = map,
                Err(err) => tracing::warn!(error = %err, "realized_pnl.json failed to parse, starting empty"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read realized_pnl.json, starting empty"),
        }

        match self.store.get_json(&recent_orders_path(&self.prefix)).await {
            Ok(Some(value)) => match serde_json::from_value::<OrdersDocument>(value) {
                Ok(doc) => state.recent_orders = doc.orders.into(),
                Err(err) => tracing::warn!(error = %err, "recent_orders.json failed to parse, starting empty"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to read recent_orders.json, starting empty"),
        }

        *self.state.lock() = state;
    }

    /// Apply a fill to the (strategy, symbol) position, update realized P&L on the SELL side,
    /// append to the bounded order log, and persist the result.
    ///
    /// BUY grows the position's weighted-average cost. SELL reduces quantity using the
    /// pre-sale average cost as a single-average, FIFO-equivalent basis: a position closed
    /// fully zeroes out, a position reduced but not closed keeps its average cost unchanged.
    pub async fn record_order(
        &self,
        order_id: impl Into<String>,
        strategy_id: StrategyId,
        symbol: Symbol,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) {
        let key = (strategy_id.clone(), symbol.clone());
        let snapshot = {
            let mut state = self.state.lock();
            let before = state
                .positions
                .entry(key.clone())
                .or_insert_with(|| StrategyPosition::flat(strategy_id.clone(), symbol.clone(), timestamp))
                .clone();

            let mut realized_delta = Decimal::ZERO;
            let after = match side {
                Side::Buy => {
                    let new_total_cost = before.total_cost + quantity * price;
                    let new_quantity = before.quantity + quantity;
                    let average_cost =
                        if new_quantity > Decimal::ZERO { new_total_cost / new_quantity } else { before.average_cost };
                    StrategyPosition {
                        quantity: new_quantity,
                        total_cost: new_total_cost,
                        average_cost,
                        last_updated: timestamp,
                        ..before
                    }
                }
                Side::Sell => {
                    let remaining_quantity = before.quantity - quantity;
                    if remaining_quantity <= Decimal::ZERO {
                        let sale_proceeds = quantity * price;
                        let cost_basis_of_sold_shares = quantity * before.average_cost;
                        realized_delta = sale_proceeds - cost_basis_of_sold_shares;
                        StrategyPosition::flat(strategy_id.clone(), symbol.clone(), timestamp)
                    } else {
                        realized_delta = quantity * (price - before.average_cost);
                        StrategyPosition {
                            quantity: remaining_quantity,
                            total_cost: remaining_quantity * before.average_cost,
                            last_updated: timestamp,
                            ..before
                        }
                    }
                }
            };

            state.positions.insert(key.clone(), after);
            if !realized_delta.is_zero() {
                *state.realized_pnl.entry(strategy_id.clone()).or_insert(Decimal::ZERO) += realized_delta;
            }

            state.recent_orders.push_back(OrderRecord {
                order_id: order_id.into(),
                strategy_id,
                symbol,
                side,
                quantity,
                price,
                timestamp,
            });
            while state.recent_orders.len() > self.order_history_limit {
                state.recent_orders.pop_front();
            }

            state.clone()
        };

        self.persist(&snapshot).await;
    }

    async fn persist(&self, state: &TrackerState) {
        let positions_doc = PositionsDocument {
            positions: state.positions.values().cloned().collect(),
            last_updated: Utc::now(),
        };
        if let Err(err) = self
            .store
            .put_json(&current_positions_path(&self.prefix), &json!(positions_doc))
            .await
        {
            tracing::warn!(error = %err, "failed to persist current_positions.json");
        }

        if let Err(err) = self
            .store
            .put_json(&realized_pnl_path(&self.prefix), &json!(state.realized_pnl))
            .await
        {
            tracing::warn!(error = %err, "failed to persist realized_pnl.json");
        }

        let orders_doc = OrdersDocument { orders: state.recent_orders.iter().cloned().collect(), version: 1 };
        if let Err(err) = self.store.put_json(&recent_orders_path(&self.prefix), &json!(orders_doc)).await {
            tracing::warn!(error = %err, "failed to persist recent_orders.json");
        }
    }

    /// P&L for one strategy against the given current prices: realized from the ledger,
    /// unrealized derived from open positions marked at the supplied prices.
    pub fn get_strategy_pnl(&self, strategy_id: &StrategyId, current_prices: &IndexMap<Symbol, Decimal>) -> StrategyPnL {
        let state = self.state.lock();
        let realized_pnl = state.realized_pnl.get(strategy_id).copied().unwrap_or(Decimal::ZERO);

        let positions: Vec<StrategyPosition> = state
            .positions
            .values()
            .filter(|p| &p.strategy_id == strategy_id && !p.is_flat())
            .cloned()
            .collect();

        let mut unrealized_pnl = Decimal::ZERO;
        let mut allocation_value = Decimal::ZERO;
        for position in &positions {
            let price = current_prices.get(&position.symbol).copied().unwrap_or(position.average_cost);
            unrealized_pnl += position.unrealized_pnl(price);
            allocation_value += position.market_value(price);
        }

        StrategyPnL {
            strategy_id: strategy_id.clone(),
            realized_pnl,
            unrealized_pnl,
            positions,
            allocation_value,
        }
    }

    /// P&L for every strategy that has ever had a position or a realized trade.
    pub fn get_all_strategy_pnl(&self, current_prices: &IndexMap<Symbol, Decimal>) -> IndexMap<StrategyId, StrategyPnL> {
        let strategy_ids: indexmap::IndexSet<StrategyId> = {
            let state = self.state.lock();
            state
                .positions
                .keys()
                .map(|(strategy_id, _)| strategy_id.clone())
                .chain(state.realized_pnl.keys().cloned())
                .collect()
        };

        strategy_ids
            .into_iter()
            .map(|strategy_id| {
                let pnl = self.get_strategy_pnl(&strategy_id, current_prices);
                (strategy_id, pnl)
            })
            .collect()
    }

    /// Filtered view over the bounded recent-orders log.
    pub fn get_order_history(
        &self,
        strategy_id: Option<&StrategyId>,
        symbol: Option<&Symbol>,
        since: Option<DateTime<Utc>>,
    ) -> Vec<OrderRecord> {
        self.state
            .lock()
            .recent_orders
            .iter()
            .filter(|order| strategy_id.is_none_or(|id| &order.strategy_id == id))
            .filter(|order| symbol.is_none_or(|s| &order.symbol == s))
            .filter(|order| since.is_none_or(|t| order.timestamp >= t))
            .cloned()
            .collect()
    }

    /// Compute and persist a dated P&L snapshot. Idempotent per `date_key`: calling this
    /// again for the same day simply overwrites the same archive document.
    pub async fn archive_daily_pnl(&self, current_prices: &IndexMap<Symbol, Decimal>, date_key: &str) {
        let all_pnl = self.get_all_strategy_pnl(current_prices);
        let document = json!({ "date": date_key, "strategies": all_pnl });
        if let Err(err) = self.store.put_json(&daily_archive_path(&self.prefix, date_key), &document).await {
            tracing::warn!(error = %err, date_key, "failed to persist daily P&L archive");
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct PositionsDocument {
    positions: Vec<StrategyPosition>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct OrdersDocument {
    orders: Vec<OrderRecord>,
    version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryObjectStore;
    use rust_decimal_macros::dec;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    fn tracker() -> StrategyTracker {
        StrategyTracker::new(Arc::new(InMemoryObjectStore::new()), "paper", 1000)
    }

    #[tokio::test]
    async fn buy_then_partial_sell_computes_realized_pnl_and_remaining_basis() {
        let tracker = tracker();
        let strategy = StrategyId::new("NUCLEAR");
        let now = Utc::now();

        tracker
            .record_order("o1", strategy.clone(), sym("SMR"), Side::Buy, dec!(100), dec!(50), now)
            .await;
        tracker
            .record_order("o2", strategy.clone(), sym("SMR"), Side::Sell, dec!(40), dec!(60), now)
            .await;

        let prices = IndexMap::from([(sym("SMR"), dec!(60))]);
        let pnl = tracker.get_strategy_pnl(&strategy, &prices);
        assert_eq!(pnl.realized_pnl, dec!(400));
        assert_eq!(pnl.positions.len(), 1);
        assert_eq!(pnl.positions[0].quantity, dec!(60));
        assert_eq!(pnl.positions[0].average_cost, dec!(50));
        assert_eq!(pnl.positions[0].total_cost, dec!(3000));
    }

    #[tokio::test]
    async fn full_round_trip_zeroes_position() {
        let tracker = tracker();
        let strategy = StrategyId::new("NUCLEAR");
        let now = Utc::now();

        tracker
            .record_order("o1", strategy.clone(), sym("SMR"), Side::Buy, dec!(100), dec!(50), now)
            .await;
        tracker
            .record_order("o2", strategy.clone(), sym("SMR"), Side::Sell, dec!(40), dec!(60), now)
            .await;
        tracker
            .record_order("o3", strategy.clone(), sym("SMR"), Side::Sell, dec!(60), dec!(45), now)
            .await;

        let prices = IndexMap::from([(sym("SMR"), dec!(45))]);
        let pnl = tracker.get_strategy_pnl(&strategy, &prices);
        assert_eq!(pnl.realized_pnl, dec!(100));
        assert!(pnl.positions.is_empty());
    }

    #[tokio::test]
    async fn order_history_filters_by_strategy_and_symbol() {
        let tracker = tracker();
        let now = Utc::now();
        tracker
            .record_order("o1", StrategyId::new("NUCLEAR"), sym("SMR"), Side::Buy, dec!(10), dec!(50), now)
            .await;
        tracker
            .record_order("o2", StrategyId::new("TECL"), sym("TQQQ"), Side::Buy, dec!(5), dec!(80), now)
            .await;

        let history = tracker.get_order_history(Some(&StrategyId::new("NUCLEAR")), None, None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].symbol, sym("SMR"));
    }

    #[tokio::test]
    async fn order_history_is_bounded_to_configured_limit() {
        let tracker = StrategyTracker::new(Arc::new(InMemoryObjectStore::new()), "paper", 2);
        let now = Utc::now();
        for i in 0..5 {
            tracker
                .record_order(format!("o{i}"), StrategyId::new("NUCLEAR"), sym("SMR"), Side::Buy, dec!(1), dec!(1), now)
                .await;
        }
        let history = tracker.get_order_history(None, None, None);
        assert_eq!(history.len(), 2);
    }
}
