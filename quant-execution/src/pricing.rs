use crate::order::OrderSide;
use crate::ports::Quote;
use quant_instrument::money::bps_diff;
pub use quant_instrument::ExecutionUrgency as Urgency;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SpreadQuality {
    Tight,
    Normal,
    Wide,
}

/// `tight` when the spread is at most 3c or 10bps of mid; `wide` when it exceeds 5c or 100bps;
/// `normal` otherwise.
pub fn spread_quality(quote: &Quote) -> SpreadQuality {
    let spread = quote.spread();
    let mid = quote.mid();
    let bps = if mid.is_zero() { Decimal::ZERO } else { (spread / mid) * Decimal::from(10_000) };

    if spread <= dec!(0.03) || bps <= dec!(10) {
        SpreadQuality::Tight
    } else if spread > dec!(0.05) || bps > dec!(100) {
        SpreadQuality::Wide
    } else {
        SpreadQuality::Normal
    }
}

/// How far inside the bid/ask spread a limit order should sit, per the spread-quality /
/// urgency table in the order placement policy.
pub fn inside_factor(quality: SpreadQuality, urgency: Urgency) -> Decimal {
    let urgent_column = matches!(urgency, Urgency::High | Urgency::Urgent);
    match (quality, urgent_column) {
        (SpreadQuality::Tight, false) => dec!(0.6),
        (SpreadQuality::Tight, true) => dec!(0.8),
        (SpreadQuality::Normal, false) => dec!(0.3),
        (SpreadQuality::Normal, true) => dec!(0.5),
        (SpreadQuality::Wide, false) => dec!(0.1),
        (SpreadQuality::Wide, true) => dec!(0.2),
    }
}

const PENNY: Decimal = dec!(0.01);

/// Result of attempting to compute a smart limit price: either a validated limit, or a
/// directive to fall back to a market order (invalid quote, or slippage beyond policy).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmartPrice {
    Limit(Decimal),
    FallBackToMarket,
}

/// Smart limit pricing: place the order just inside the spread, more aggressively for wider
/// spreads or higher urgency, and never further from the quote than the configured slippage
/// budget allows.
pub fn smart_limit_price(side: OrderSide, quote: &Quote, urgency: Urgency, max_slippage_bps: Decimal) -> SmartPrice {
    if !quote.is_valid() {
        return SmartPrice::FallBackToMarket;
    }

    let quality = spread_quality(quote);
    let factor = inside_factor(quality, urgency);
    let spread = quote.spread();
    let mid = quote.mid();

    let mut price = match side {
        OrderSide::Buy => (quote.ask - spread * factor).max(quote.bid + PENNY),
        OrderSide::Sell => (quote.bid + spread * factor).min(quote.ask - PENNY),
    };

    if matches!(urgency, Urgency::Urgent) {
        price = match side {
            OrderSide::Buy => (price + PENNY).min(quote.ask),
            OrderSide::Sell => (price - PENNY).max(quote.bid),
        };
    }

    let slippage_bps = bps_diff(price, mid);
    if slippage_bps > max_slippage_bps {
        return SmartPrice::FallBackToMarket;
    }

    SmartPrice::Limit(price)
}

/// Aggressive marketable-limit policy for leveraged ETFs or urgent fills: cross the spread by
/// a cent rather than try to capture it, trading a small known slippage for certainty of fill.
pub fn aggressive_marketable_limit(side: OrderSide, quote: &Quote) -> Decimal {
    match side {
        OrderSide::Buy => quote.ask + PENNY,
        OrderSide::Sell => (quote.bid - PENNY).max(PENNY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Quote;
    use chrono::Utc;

    fn quote(bid: Decimal, ask: Decimal) -> Quote {
        Quote { bid, ask, bid_size: dec!(100), ask_size: dec!(100), timestamp: Utc::now() }
    }

    #[test]
    fn buy_and_sell_limits_land_inside_the_spread() {
        let q = quote(dec!(100.00), dec!(100.10));
        let buy = smart_limit_price(OrderSide::Buy, &q, Urgency::Normal, dec!(50));
        let sell = smart_limit_price(OrderSide::Sell, &q, Urgency::Normal, dec!(50));

        let SmartPrice::Limit(buy_price) = buy else { panic!("expected a limit price") };
        let SmartPrice::Limit(sell_price) = sell else { panic!("expected a limit price") };

        assert!(buy_price > q.bid && buy_price < q.ask);
        assert!(sell_price > q.bid && sell_price < q.ask);
    }

    #[test]
    fn urgent_buy_price_is_at_least_as_aggressive_as_normal() {
        let q = quote(dec!(100.00), dec!(100.10));
        let SmartPrice::Limit(normal) = smart_limit_price(OrderSide::Buy, &q, Urgency::Normal, dec!(50)) else {
            panic!("expected limit")
        };
        let SmartPrice::Limit(urgent) = smart_limit_price(OrderSide::Buy, &q, Urgency::Urgent, dec!(50)) else {
            panic!("expected limit")
        };
        assert!(urgent >= normal);
    }

    #[test]
    fn urgent_sell_price_is_at_least_as_aggressive_as_normal() {
        let q = quote(dec!(100.00), dec!(100.10));
        let SmartPrice::Limit(normal) = smart_limit_price(OrderSide::Sell, &q, Urgency::Normal, dec!(50)) else {
            panic!("expected limit")
        };
        let SmartPrice::Limit(urgent) = smart_limit_price(OrderSide::Sell, &q, Urgency::Urgent, dec!(50)) else {
            panic!("expected limit")
        };
        assert!(urgent <= normal);
    }

    #[test]
    fn inverted_quote_falls_back_to_market() {
        let q = quote(dec!(100.10), dec!(100.00));
        assert_eq!(smart_limit_price(OrderSide::Buy, &q, Urgency::Normal, dec!(50)), SmartPrice::FallBackToMarket);
    }

    #[test]
    fn spread_quality_uses_the_full_spread_in_bps_not_half() {
        // spread = 0.04 (inside the 0.03-0.05 "normal" cents band), mid = 2.00, so the
        // bps-of-mid reading is the only thing that can classify this quote. Full-spread bps
        // is 0.04 / 2.00 * 10_000 = 200bps, over the 100bps "wide" threshold. Halving it (the
        // historical bug, which compared `ask` to `mid` instead of the whole spread to `mid`)
        // would read 100bps exactly, which is not `> 100` and misses the wide classification.
        let q = quote(dec!(1.98), dec!(2.02));
        assert_eq!(spread_quality(&q), SpreadQuality::Wide);
    }

    #[test]
    fn aggressive_marketable_limit_crosses_the_spread() {
        let q = quote(dec!(100.00), dec!(100.10));
        assert_eq!(aggressive_marketable_limit(OrderSide::Buy, &q), dec!(100.11));
        assert_eq!(aggressive_marketable_limit(OrderSide::Sell, &q), dec!(99.99));
    }
}
