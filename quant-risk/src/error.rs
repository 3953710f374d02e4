use quant_instrument::Symbol;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("target weights sum to {total}, which exceeds the 1.01 tolerance")]
    InvalidPortfolio { total: Decimal },

    #[error("leverage requested but snapshot has no margin data")]
    InsufficientMarginData,

    #[error("margin safety check failed: {reason}")]
    MarginSafety { reason: String },

    #[error("missing price for {symbol} while holding a non-zero position")]
    MissingPrice { symbol: Symbol },

    #[error("insufficient capital: need {needed}, available {available}, deficit {deficit}")]
    InsufficientCapital { needed: Decimal, available: Decimal, deficit: Decimal },
}
