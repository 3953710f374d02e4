use quant_instrument::StrategyId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy {strategy_id} is missing required market data for {detail}")]
    MissingData { strategy_id: StrategyId, detail: String },

    #[error("strategy {strategy_id} failed to converge: {detail}")]
    ComputationFailed { strategy_id: StrategyId, detail: String },

    #[error("strategy {0} is not registered")]
    UnknownStrategy(StrategyId),

    #[error(transparent)]
    Signal(#[from] crate::signal::SignalError),
}
