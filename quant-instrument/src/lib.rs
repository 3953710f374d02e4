//! Core data model shared across the quant trading engine: [`Symbol`], [`StrategyId`],
//! account/portfolio value objects and decimal-money helpers.
//!
//! Floating point never appears here: every monetary figure, weight and quantity is a
//! [`rust_decimal::Decimal`].

pub mod account;
pub mod money;
pub mod symbol;
pub mod strategy_id;
pub mod urgency;

pub use account::{BrokerPosition, MarginInfo, PortfolioSnapshot, PositionSide, SnapshotError};
pub use symbol::{Symbol, SymbolError};
pub use strategy_id::StrategyId;
pub use urgency::ExecutionUrgency;
