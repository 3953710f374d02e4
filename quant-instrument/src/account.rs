use crate::money::round_half_up_cents;
use crate::symbol::Symbol;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Margin/leverage facts reported by the broker, as surfaced by the Account Port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginInfo {
    pub buying_power: Decimal,
    pub intraday_buying_power: Decimal,
    pub effective_buying_power: Decimal,
    pub multiplier: Decimal,
    pub margin_utilization_pct: Decimal,
    pub maintenance_buffer_pct: Decimal,
    pub is_pdt_account: bool,
}

impl MarginInfo {
    /// The tighter of the two buying-power figures the Planner is allowed to deploy against.
    pub fn deployable_buying_power(&self) -> Decimal {
        self.intraday_buying_power.min(self.effective_buying_power)
    }
}

/// A single broker-reported holding, as returned by `AccountPort::get_positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pl: Decimal,
    pub unrealized_plpc: Decimal,
    pub side: PositionSide,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SnapshotError {
    #[error("position {symbol} has quantity {quantity} but no price was supplied")]
    MissingPrice { symbol: Symbol, quantity: Decimal },
    #[error("cash ({cash}) exceeds total portfolio value ({total_value}) in cash-only mode")]
    CashExceedsTotalValue { cash: Decimal, total_value: Decimal },
}

/// A read-only snapshot of account state, captured at the start of a run and refreshed after
/// SELL settlement. The single source of truth for "what does the account currently hold".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    pub cash: Decimal,
    pub positions: IndexMap<Symbol, Decimal>,
    pub prices: IndexMap<Symbol, Decimal>,
    pub margin_info: Option<MarginInfo>,
}

impl PortfolioSnapshot {
    /// Construct a snapshot, validating the invariants spelled out in the data model: every
    /// held symbol must have a known price, and (absent margin) cash cannot exceed total value.
    pub fn new(
        total_value: Decimal,
        cash: Decimal,
        positions: IndexMap<Symbol, Decimal>,
        prices: IndexMap<Symbol, Decimal>,
        margin_info: Option<MarginInfo>,
    ) -> Result<Self, SnapshotError> {
        for (symbol, quantity) in &positions {
            if *quantity > Decimal::ZERO && !prices.contains_key(symbol) {
                return Err(SnapshotError::MissingPrice {
                    symbol: symbol.clone(),
                    quantity: *quantity,
                });
            }
        }
        if margin_info.is_none() && cash > total_value {
            return Err(SnapshotError::CashExceedsTotalValue { cash, total_value });
        }
        Ok(Self { total_value, cash, positions, prices, margin_info })
    }

    pub fn quantity_of(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn price_of(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }

    /// Dollar value of the current holding in `symbol`, rounded to cents.
    pub fn market_value(&self, symbol: &Symbol) -> Option<Decimal> {
        let qty = self.quantity_of(symbol);
        if qty.is_zero() {
            return Some(Decimal::ZERO);
        }
        self.price_of(symbol).map(|price| round_half_up_cents(qty * price))
    }
}
