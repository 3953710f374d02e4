use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// The result of a single `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitCheck {
    pub headroom: Decimal,
    pub would_exceed_by: Decimal,
    pub is_within_limit: bool,
}

struct Inner {
    date_key: String,
    cumulative_value: Decimal,
}

/// Process-wide circuit breaker on cumulative absolute trade value for the current UTC day.
/// Guarded by a single mutex; `check_limit`/`record_trade` are both O(1).
pub struct DailyTradeLimitState {
    daily_limit: Decimal,
    inner: Mutex<Inner>,
}

impl DailyTradeLimitState {
    pub fn new(daily_limit: Decimal) -> Self {
        Self {
            daily_limit,
            inner: Mutex::new(Inner { date_key: Self::today_key(), cumulative_value: Decimal::ZERO }),
        }
    }

    fn today_key() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Roll `cumulative_value` back to zero if the UTC date has changed since the last call.
    fn reset_if_new_day(inner: &mut Inner) {
        let today = Self::today_key();
        if inner.date_key != today {
            inner.date_key = today;
            inner.cumulative_value = Decimal::ZERO;
        }
    }

    pub fn check_limit(&self, proposed_value: Decimal) -> LimitCheck {
        let mut inner = self.inner.lock();
        Self::reset_if_new_day(&mut inner);

        let headroom = self.daily_limit - inner.cumulative_value;
        let would_exceed_by = (inner.cumulative_value + proposed_value - self.daily_limit).max(Decimal::ZERO);
        LimitCheck { headroom, would_exceed_by, is_within_limit: proposed_value <= headroom }
    }

    /// Record a submitted trade's value against today's cumulative total. Callers must only do
    /// this after a successful `check_limit`; recording after a failed check would understate
    /// the breaker's protection.
    pub fn record_trade(&self, value: Decimal) {
        let mut inner = self.inner.lock();
        Self::reset_if_new_day(&mut inner);
        inner.cumulative_value += value;
    }

    pub fn cumulative_value(&self) -> Decimal {
        let mut inner = self.inner.lock();
        Self::reset_if_new_day(&mut inner);
        inner.cumulative_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn allows_trades_within_limit() {
        let state = DailyTradeLimitState::new(dec!(5000));
        let check = state.check_limit(dec!(3000));
        assert!(check.is_within_limit);
        assert_eq!(check.headroom, dec!(5000));
        state.record_trade(dec!(3000));

        let check = state.check_limit(dec!(1000));
        assert!(check.is_within_limit);
        assert_eq!(check.headroom, dec!(2000));
    }

    #[test]
    fn trips_when_proposed_exceeds_headroom() {
        let state = DailyTradeLimitState::new(dec!(5000));
        state.record_trade(dec!(3000));

        let check = state.check_limit(dec!(3000));
        assert!(!check.is_within_limit);
        assert_eq!(check.would_exceed_by, dec!(1000));
    }

    #[test]
    fn cumulative_value_is_process_wide_across_calls() {
        let state = DailyTradeLimitState::new(dec!(10000));
        state.record_trade(dec!(1000));
        state.record_trade(dec!(2000));
        assert_eq!(state.cumulative_value(), dec!(3000));
    }
}
