use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Money-math helpers shared by the planner, execution engine and tracker.
///
/// Floating point is never used for money, weights or quantities anywhere in this workspace;
/// every value here is `rust_decimal::Decimal`.

/// Round to whole cents, half-up, as the original `ROUND_HALF_UP` Python semantics require.
pub fn round_half_up_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a fractional share quantity down to 6 decimal places (never round up past what the
/// account actually holds or can afford).
pub fn floor_to_six_dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(6, RoundingStrategy::ToZero)
}

/// Round a share quantity down to a whole share (used for non-fractionable symbols on the
/// limit-order path).
pub fn floor_to_whole_share(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::ToZero)
}

/// Basis points between `value` and `reference`, e.g. slippage of a limit price from mid.
pub fn bps_diff(value: Decimal, reference: Decimal) -> Decimal {
    if reference.is_zero() {
        return Decimal::ZERO;
    }
    ((value - reference).abs() / reference) * Decimal::from(10_000)
}

/// Serialize/deserialize `Decimal` as a JSON string, preserving precision on the wire as
/// required by the persistence layout and broker wire schema.
pub mod as_decimal_string {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Decimal::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
