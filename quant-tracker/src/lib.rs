//! Per-strategy position and cost-basis tracking: records every filled order against the
//! strategy that caused it, maintains realized/unrealized P&L, and persists both to durable
//! JSON object storage so state survives a process restart.

pub mod error;
pub mod persistence;
pub mod pnl;
pub mod position;
pub mod tracker;

pub use error::TrackerError;
pub use persistence::{FilesystemObjectStore, InMemoryObjectStore, ObjectStore};
pub use pnl::StrategyPnL;
pub use position::{OrderRecord, Side, StrategyPosition};
pub use tracker::StrategyTracker;
