//! Broker account/market-data ports, smart order pricing, and the sell-then-buy execution
//! engine that turns a [`quant_risk::RebalancePlan`] into submitted, settled broker orders.

pub mod engine;
pub mod error;
pub mod order;
pub mod pricing;
pub mod ports;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{ExecutionConfig, ExecutionEngine, ExecutionResult, ItemOutcome};
pub use error::ExecutionError;
pub use order::{FilledOrder, OrderRequest, OrderSide, OrderSize, OrderState, OrderType, TimeInForce};
pub use ports::{AccountPort, AccountSnapshot, MarketDataPort, OrderDescriptor, OrderStatusReport, Quote};
pub use pricing::{spread_quality, SmartPrice, SpreadQuality, Urgency};
