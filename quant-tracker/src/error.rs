use quant_instrument::{StrategyId, Symbol};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("persistence write failed for {path}: {detail}")]
    PersistenceWrite { path: String, detail: String },

    #[error("persistence read failed for {path}: {detail}")]
    PersistenceRead { path: String, detail: String },

    #[error("no position for strategy {strategy_id} in {symbol}")]
    NoPosition { strategy_id: StrategyId, symbol: Symbol },
}
