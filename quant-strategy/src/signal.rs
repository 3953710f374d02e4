use chrono::{DateTime, Utc};
use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SignalError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(Decimal),
    #[error("target_allocation {0} is outside [0, 1]")]
    AllocationOutOfRange(Decimal),
    #[error("BUY signal for {symbol} must have a positive target_allocation, got {target_allocation}")]
    BuyRequiresAllocation { symbol: Symbol, target_allocation: Decimal },
}

/// A single strategy's opinion on a symbol for this run, produced once and consumed once by
/// the Signal Aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySignal {
    pub symbol: Symbol,
    pub action: Action,
    pub confidence: Decimal,
    pub target_allocation: Decimal,
    pub reasoning: String,
    pub strategy_id: StrategyId,
    pub timestamp: DateTime<Utc>,
}

impl StrategySignal {
    pub fn new(
        symbol: Symbol,
        action: Action,
        confidence: Decimal,
        target_allocation: Decimal,
        reasoning: impl Into<String>,
        strategy_id: StrategyId,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, SignalError> {
        if !(Decimal::ZERO..=Decimal::ONE).contains(&confidence) {
            return Err(SignalError::ConfidenceOutOfRange(confidence));
        }
        if !(Decimal::ZERO..=Decimal::ONE).contains(&target_allocation) {
            return Err(SignalError::AllocationOutOfRange(target_allocation));
        }
        if matches!(action, Action::Buy) && target_allocation <= Decimal::ZERO {
            return Err(SignalError::BuyRequiresAllocation { symbol, target_allocation });
        }
        Ok(Self {
            symbol,
            action,
            confidence,
            target_allocation,
            reasoning: reasoning.into(),
            strategy_id,
            timestamp,
        })
    }
}
