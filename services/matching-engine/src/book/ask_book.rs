//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};
use types::order::Order;

use super::price_level::{LevelEntry, PriceLevel};

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
/// At each price level, orders are maintained in admission-sequence order.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert a resting order into the ask book
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

    /// Remove an order from the ask book
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

    /// Get the best ask (lowest price) and its aggregate quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best ask price
    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Ask prices a buy taker can match, best (lowest) first
    ///
    /// `limit` bounds the walk for limit orders; None (market) walks the
    /// entire side.
    pub fn prices_in_range(&self, limit: Option<Price>) -> Vec<Price> {
        self.levels
            .keys()
            .copied()
            .take_while(|price| limit.map(|l| *price <= l).unwrap_or(true))
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

    /// Resting quantity a buy taker from `user_id` could consume within `limit`
    pub fn available_to(&self, limit: Option<Price>, user_id: UserId) -> Quantity {
        self.levels
            .iter()
            .take_while(|(price, _)| limit.map(|l| **price <= l).unwrap_or(true))
            .fold(Quantity::zero(), |acc, (_, level)| {
                acc + level.quantity_excluding(user_id)
            })
    }

    /// Get depth snapshot (top N price levels, aggregated by price)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter() // lowest prices first
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
