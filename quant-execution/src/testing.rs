//! In-process mock [`AccountPort`]/[`MarketDataPort`] implementations, built the way the rest of
//! this workspace mocks broker calls: scripted, deterministic, no network. Feature-gated behind
//! `testing` so downstream crates can exercise [`ExecutionEngine`](crate::engine::ExecutionEngine)
//! without pulling a real broker integration into their dev-dependencies.

use crate::error::ExecutionError;
use crate::order::{OrderRequest, OrderSize, OrderState, OrderType};
use crate::ports::{AccountPort, AccountSnapshot, MarketDataPort, OrderDescriptor, OrderStatusReport, Quote};
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use quant_instrument::{BrokerPosition, MarginInfo, Symbol};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

/// Scripted response for one order: what `submit_order` returns, and what `get_order_status`
/// reports once polled (immediately terminal — no multi-poll staging, since the engine's
/// settlement loop is exercised separately by timing tests).
#[derive(Debug, Clone)]
pub struct ScriptedFill {
    pub state: OrderState,
    pub filled_quantity: Decimal,
    pub filled_avg_price: Decimal,
}

pub struct MockAccountPort {
    snapshot: Mutex<AccountSnapshot>,
    positions: Mutex<Vec<BrokerPosition>>,
    open_orders: Mutex<Vec<OrderDescriptor>>,
    fills: Mutex<IndexMap<String, ScriptedFill>>,
    reject_next: Mutex<Option<String>>,
    next_order_id: AtomicU64,
    pub submitted: Mutex<Vec<OrderRequest>>,
}

impl MockAccountPort {
    pub fn new(snapshot: AccountSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            positions: Mutex::new(Vec::new()),
            open_orders: Mutex::new(Vec::new()),
            fills: Mutex::new(IndexMap::new()),
            reject_next: Mutex::new(None),
            next_order_id: AtomicU64::new(1),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_snapshot(&self, snapshot: AccountSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn push_position(&self, position: BrokerPosition) {
        self.positions.lock().push(position);
    }

    pub fn push_open_order(&self, order: OrderDescriptor) {
        self.open_orders.lock().push(order);
    }

    /// Script the given order id to resolve to `fill` the next time its status is polled.
    pub fn script_fill(&self, order_id: impl Into<String>, fill: ScriptedFill) {
        self.fills.lock().insert(order_id.into(), fill);
    }

    /// Make the next `submit_order` call fail with a broker rejection.
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        *self.reject_next.lock() = Some(reason.into());
    }
}

#[async_trait]
impl AccountPort for MockAccountPort {
    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, ExecutionError> {
        Ok(self.snapshot.lock().clone())
    }

    async fn get_positions(&self) -> Result<Vec<BrokerPosition>, ExecutionError> {
        Ok(self.positions.lock().clone())
    }

    async fn get_open_orders(&self) -> Result<Vec<OrderDescriptor>, ExecutionError> {
        Ok(self.open_orders.lock().clone())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExecutionError> {
        let mut open = self.open_orders.lock();
        let before = open.len();
        open.retain(|o| o.order_id != order_id);
        Ok(open.len() != before)
    }

    async fn liquidate_position(&self, symbol: &Symbol) -> Result<String, ExecutionError> {
        let order_id = format!("mock-liq-{}", self.next_order_id.fetch_add(1, Ordering::SeqCst));
        self.fills.lock().insert(
            order_id.clone(),
            ScriptedFill { state: OrderState::Filled, filled_quantity: Decimal::ZERO, filled_avg_price: Decimal::ZERO },
        );
        tracing::debug!(%symbol, %order_id, "mock liquidation submitted");
        Ok(order_id)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<String, ExecutionError> {
        if let Some(reason) = self.reject_next.lock().take() {
            return Err(ExecutionError::OrderRejected { order_id: "rejected".to_string(), reason });
        }
        self.submitted.lock().push(request.clone());
        let order_id = format!("mock-{}", self.next_order_id.fetch_add(1, Ordering::SeqCst));
        Ok(order_id)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatusReport, ExecutionError> {
        let fills = self.fills.lock();
        let scripted = fills.get(order_id).cloned().unwrap_or(ScriptedFill {
            state: OrderState::Filled,
            filled_quantity: Decimal::ZERO,
            filled_avg_price: Decimal::ZERO,
        });
        Ok(OrderStatusReport {
            order_id: order_id.to_string(),
            state: scripted.state,
            filled_quantity: scripted.filled_quantity,
            filled_avg_price: scripted.filled_avg_price,
            updated_at: Utc::now(),
        })
    }
}

pub struct MockMarketDataPort {
    prices: Mutex<IndexMap<Symbol, Decimal>>,
    quotes: Mutex<IndexMap<Symbol, Quote>>,
    fractionable: Mutex<IndexMap<Symbol, bool>>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self { prices: Mutex::new(IndexMap::new()), quotes: Mutex::new(IndexMap::new()), fractionable: Mutex::new(IndexMap::new()) }
    }

    pub fn set_price(&self, symbol: Symbol, price: Decimal) {
        self.prices.lock().insert(symbol, price);
    }

    pub fn set_quote(&self, symbol: Symbol, quote: Quote) {
        self.quotes.lock().insert(symbol, quote);
    }

    pub fn set_fractionable(&self, symbol: Symbol, fractionable: bool) {
        self.fractionable.lock().insert(symbol, fractionable);
    }
}

impl Default for MockMarketDataPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for MockMarketDataPort {
    async fn get_current_price(&self, symbol: &Symbol) -> Result<Option<Decimal>, ExecutionError> {
        Ok(self.prices.lock().get(symbol).copied())
    }

    async fn get_latest_quote(&self, symbol: &Symbol) -> Result<Option<Quote>, ExecutionError> {
        Ok(self.quotes.lock().get(symbol).copied())
    }

    async fn is_fractionable(&self, symbol: &Symbol) -> Result<bool, ExecutionError> {
        Ok(self.fractionable.lock().get(symbol).copied().unwrap_or(false))
    }
}

pub fn flat_margin_info(buying_power: Decimal) -> MarginInfo {
    MarginInfo {
        buying_power,
        intraday_buying_power: buying_power,
        effective_buying_power: buying_power,
        multiplier: Decimal::ONE,
        margin_utilization_pct: Decimal::ZERO,
        maintenance_buffer_pct: Decimal::ONE,
        is_pdt_account: false,
    }
}

/// A plain, no-frills long position at its current market price, for seeding
/// [`MockAccountPort::push_position`] in tests that don't care about entry price or P&L.
pub fn long_position(symbol: Symbol, quantity: Decimal, current_price: Decimal) -> BrokerPosition {
    BrokerPosition {
        symbol,
        quantity,
        avg_entry_price: current_price,
        current_price,
        market_value: quantity * current_price,
        unrealized_pl: Decimal::ZERO,
        unrealized_plpc: Decimal::ZERO,
        side: quant_instrument::PositionSide::Long,
    }
}
