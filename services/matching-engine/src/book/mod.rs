//! Order book infrastructure module
//!
//! Contains price levels, bid book, ask book, and the per-symbol book pair.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::{LevelEntry, PriceLevel};

use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Both sides of one symbol's in-memory book
#[derive(Debug, Clone, Default)]
pub struct SymbolBook {
    pub bids: BidBook,
    pub asks: AskBook,
}

impl SymbolBook {
    pub fn new() -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    /// Rest an order on its own side
    pub fn insert(&mut self, order: &Order) {
        match order.side {
            Side::BUY => self.bids.insert(order),
            Side::SELL => self.asks.insert(order),
        }
    }

    /// Remove a resting order
    pub fn remove(&mut self, side: Side, order_id: &OrderId, price: Price) -> bool {
        match side {
            Side::BUY => self.bids.remove(order_id, price),
            Side::SELL => self.asks.remove(order_id, price),
        }
    }

    /// Best price on the side a taker of `side` would match against
    pub fn best_opposite_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::BUY => self.asks.best_ask_price(),
            Side::SELL => self.bids.best_bid_price(),
        }
    }

    /// Opposite-side prices a taker can match, best first, bounded by `limit`
    pub fn opposite_prices(&self, side: Side, limit: Option<Price>) -> Vec<Price> {
        match side {
            Side::BUY => self.asks.prices_in_range(limit),
            Side::SELL => self.bids.prices_in_range(limit),
        }
    }

    /// Mutable opposite-side level at `price`
    pub fn opposite_level_mut(&mut self, side: Side, price: Price) -> Option<&mut PriceLevel> {
        match side {
            Side::BUY => self.asks.level_mut(price),
            Side::SELL => self.bids.level_mut(price),
        }
    }

    /// Drop an emptied opposite-side level
    pub fn prune_opposite_level(&mut self, side: Side, price: Price) {
        match side {
            Side::BUY => self.asks.prune_level(price),
            Side::SELL => self.bids.prune_level(price),
        }
    }

    /// Opposite-side quantity available to a taker, excluding its own orders
    pub fn opposite_available(&self, side: Side, limit: Option<Price>, user_id: UserId) -> Quantity {
        match side {
            Side::BUY => self.asks.available_to(limit, user_id),
            Side::SELL => self.bids.available_to(limit, user_id),
        }
    }
}
