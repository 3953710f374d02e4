use chrono::{DateTime, Utc};
use quant_instrument::{StrategyId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    NotionalMarket,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
}

/// Either a fixed share quantity or a dollar notional amount — the broker computes whole shares
/// itself for the latter, used for non-fractionable symbols or fractional target sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderSize {
    Quantity(Decimal),
    Notional(Decimal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: OrderSize,
    pub limit_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub extended_hours: bool,
    pub strategy_id: StrategyId,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderState {
    New,
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    Error,
}

impl OrderState {
    /// FILLED, CANCELED, REJECTED, EXPIRED, ERROR are terminal. PARTIALLY_FILLED is
    /// quasi-terminal: treated as settled for phase-sequencing, though the remainder is left
    /// outstanding with the broker.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected | Self::Expired | Self::Error)
    }

    pub fn is_settled_for_sequencing(&self) -> bool {
        self.is_terminal() || matches!(self, Self::PartiallyFilled)
    }

    /// Validate a state machine transition, matching the lifecycle in
    /// NEW -> (SUBMITTED -> ACCEPTED) -> (PARTIALLY_FILLED -> FILLED) | CANCELED | REJECTED |
    /// EXPIRED | ERROR.
    pub fn can_transition_to(&self, next: &OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (New, Submitted)
                | (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Submitted, Error)
                | (Accepted, PartiallyFilled)
                | (Accepted, Filled)
                | (Accepted, Canceled)
                | (Accepted, Expired)
                | (Accepted, Error)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Canceled)
                | (PartiallyFilled, Expired)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledOrder {
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Decimal,
    pub strategy_id: StrategyId,
    pub filled_at: DateTime<Utc>,
}

impl FilledOrder {
    pub fn notional(&self) -> Decimal {
        self.filled_quantity * self.avg_fill_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_recognized() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Canceled.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
        assert!(OrderState::PartiallyFilled.is_settled_for_sequencing());
    }

    #[test]
    fn rejects_illegal_transitions() {
        assert!(OrderState::New.can_transition_to(&OrderState::Submitted));
        assert!(!OrderState::New.can_transition_to(&OrderState::Filled));
        assert!(OrderState::Accepted.can_transition_to(&OrderState::PartiallyFilled));
        assert!(!OrderState::Filled.can_transition_to(&OrderState::Canceled));
    }
}
