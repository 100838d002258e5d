//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};
use types::order::Order;

use super::price_level::{LevelEntry, PriceLevel};

/// Bid (buy) side order book
///
/// Orders are sorted by price descending, so the highest bid is first.
/// At each price level, orders are maintained in admission-sequence order.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; BTreeMap iterates ascending, so best bid is `next_back`
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert a resting order into the bid book
    pub fn insert(&mut self, order: &Order) {
        let price = order.price.expect("resting orders carry a price");
        let level = self.levels.entry(price).or_insert_with(PriceLevel::new);
        level.insert(LevelEntry {
            order_id: order.order_id,
            user_id: order.user_id,
            sequence: order.sequence,
            remaining: order.remaining,
        });
    }

    /// Remove an order from the bid book
    ///
    /// Returns true if the order was found and removed
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Get the best bid (highest price) and its aggregate quantity
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best bid price
    pub fn best_bid_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Bid prices a sell taker can match, best (highest) first
    ///
    /// `limit` bounds the walk for limit orders; None (market) walks the
    /// entire side.
    pub fn prices_in_range(&self, limit: Option<Price>) -> Vec<Price> {
        self.levels
            .keys()
            .rev()
            .copied()
            .take_while(|price| limit.map(|l| *price >= l).unwrap_or(true))
            .collect()
    }

    /// Mutable access to the level at `price`
    pub fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Drop the level at `price` if it became empty
    pub fn prune_level(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(|level| level.is_empty()) {
            self.levels.remove(&price);
        }
    }

    /// Resting quantity a sell taker from `user_id` could consume within `limit`
    pub fn available_to(&self, limit: Option<Price>, user_id: UserId) -> Quantity {
        self.levels
            .iter()
            .rev()
            .take_while(|(price, _)| limit.map(|l| **price >= l).unwrap_or(true))
            .fold(Quantity::zero(), |acc, (_, level)| {
                acc + level.quantity_excluding(user_id)
            })
    }

    /// Get depth snapshot (top N price levels, aggregated by price)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .rev() // highest prices first
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::ids::{Symbol, UserId};
    use types::numeric::Quantity;
    use types::order::{OrderRequest, Side};

    fn bid_order(price: u64, qty: &str, sequence: u64) -> Order {
        let request = OrderRequest::limit(
            UserId::new(),
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Price::from_u64(price),
            Quantity::from_str(qty).unwrap(),
        );
        Order::new(&request, sequence, Decimal::ZERO, 1708123456789000000)
    }

    #[test]
    fn test_bid_book_insert() {
        let mut book = BidBook::new();
        book.insert(&bid_order(50000, "1.5", 1));

        assert_eq!(book.level_count(), 1);
        assert!(!book.is_empty());
    }

    #[test]
    fn test_bid_book_best_bid() {
        let mut book = BidBook::new();
        book.insert(&bid_order(50000, "1.0", 1));
        book.insert(&bid_order(51000, "2.0", 2)); // higher price
        book.insert(&bid_order(49000, "1.5", 3)); // lower price

        let (best_price, best_qty) = book.best_bid().unwrap();
        assert_eq!(best_price, Price::from_u64(51000));
        assert_eq!(best_qty, Quantity::from_str("2.0").unwrap());
    }

    #[test]
    fn test_bid_book_remove() {
        let mut book = BidBook::new();
        let order = bid_order(50000, "1.0", 1);
        book.insert(&order);

        assert!(book.remove(&order.order_id, Price::from_u64(50000)));
        assert!(book.is_empty());
        assert!(!book.remove(&order.order_id, Price::from_u64(50000)));
    }

    #[test]
    fn test_bid_book_prices_in_range() {
        let mut book = BidBook::new();
        book.insert(&bid_order(50000, "1.0", 1));
        book.insert(&bid_order(51000, "1.0", 2));
        book.insert(&bid_order(49000, "1.0", 3));

        // A sell limited at 49500 can hit 51000 and 50000, best first
        let prices = book.prices_in_range(Some(Price::from_u64(49500)));
        assert_eq!(prices, vec![Price::from_u64(51000), Price::from_u64(50000)]);

        // A market sell walks the whole side
        let all = book.prices_in_range(None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], Price::from_u64(51000));
    }

    #[test]
    fn test_bid_book_depth_snapshot() {
        let mut book = BidBook::new();
        book.insert(&bid_order(50000, "1.0", 1));
        book.insert(&bid_order(51000, "2.0", 2));
        book.insert(&bid_order(49000, "1.5", 3));
        book.insert(&bid_order(52000, "0.5", 4));

        let depth = book.depth_snapshot(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(52000));
        assert_eq!(depth[1].0, Price::from_u64(51000));
    }

    #[test]
    fn test_bid_book_aggregates_same_price() {
        let mut book = BidBook::new();
        book.insert(&bid_order(50000, "1.0", 1));
        book.insert(&bid_order(50000, "2.0", 2));

        assert_eq!(book.level_count(), 1);
        let (price, total) = book.best_bid().unwrap();
        assert_eq!(price, Price::from_u64(50000));
        assert_eq!(total, Quantity::from_str("3.0").unwrap());
    }
}
