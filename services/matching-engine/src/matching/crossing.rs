//! Crossing detection logic
//!
//! Determines when a taker and a resting order can match on price.

use types::numeric::Price;
use types::order::Side;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be
/// greater than or equal to the sell price.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if a taker accepts a resting order's price
///
/// Market takers (no limit) accept any price; limit takers accept prices
/// at or better than their limit.
pub fn taker_accepts(side: Side, taker_limit: Option<Price>, maker_price: Price) -> bool {
    match taker_limit {
        None => true,
        Some(limit) => match side {
            Side::BUY => limit >= maker_price,
            Side::SELL => limit <= maker_price,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_match_crossing() {
        assert!(can_match(Price::from_u64(50000), Price::from_u64(49000)));
    }

    #[test]
    fn test_can_match_exact() {
        let price = Price::from_u64(50000);
        assert!(can_match(price, price), "Equal prices should match");
    }

    #[test]
    fn test_can_match_no_cross() {
        assert!(!can_match(Price::from_u64(49000), Price::from_u64(50000)));
    }

    #[test]
    fn test_market_taker_accepts_any_price() {
        assert!(taker_accepts(Side::BUY, None, Price::from_u64(99999)));
        assert!(taker_accepts(Side::SELL, None, Price::from_u64(1)));
    }

    #[test]
    fn test_limit_taker_bounds() {
        let limit = Some(Price::from_u64(50000));
        assert!(taker_accepts(Side::BUY, limit, Price::from_u64(49000)));
        assert!(!taker_accepts(Side::BUY, limit, Price::from_u64(50001)));
        assert!(taker_accepts(Side::SELL, limit, Price::from_u64(51000)));
        assert!(!taker_accepts(Side::SELL, limit, Price::from_u64(49999)));
    }
}
