//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at a specific price point.
//! Orders are maintained in arrival-sequence order to enforce time priority;
//! a partially filled order keeps its original position.

use std::collections::VecDeque;
use types::ids::{OrderId, UserId};
use types::numeric::Quantity;

/// One resting order's footprint in the book
#[derive(Debug, Clone, PartialEq)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Global admission sequence; FIFO tie-breaker at this price
    pub sequence: u64,
    pub remaining: Quantity,
}

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering by admission sequence.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Queue of orders at this price level, ascending sequence
    orders: VecDeque<LevelEntry>,
    /// Total quantity available at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an entry at the back of the queue (time priority)
    ///
    /// Book rebuilds insert in ascending sequence order, so appending
    /// preserves original priority.
    pub fn insert(&mut self, entry: LevelEntry) {
        debug_assert!(
            self.orders
                .back()
                .map(|last| last.sequence < entry.sequence)
                .unwrap_or(true),
            "level entries must arrive in ascending sequence order"
        );
        self.total_quantity = self.total_quantity + entry.remaining;
        self.orders.push_back(entry);
    }

    /// Remove an order from the queue by id
    ///
    /// Returns the remaining quantity of the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self.orders.iter().position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining);
        Some(entry.remaining)
    }

    /// Look at the entry at queue position `index` without removing it
    pub fn entry_at(&self, index: usize) -> Option<&LevelEntry> {
        self.orders.get(index)
    }

    /// Consume `quantity` from the entry at `index`
    ///
    /// The entry is removed once its remaining quantity reaches zero, so the
    /// index keeps pointing at the next candidate.
    ///
    /// # Panics
    /// Panics if the fill exceeds the entry's remaining quantity
    pub fn fill_at(&mut self, index: usize, quantity: Quantity) {
        let entry = self
            .orders
            .get_mut(index)
            .expect("fill_at targets an existing entry");
        assert!(
            quantity <= entry.remaining,
            "fill exceeds resting remainder"
        );

        entry.remaining = entry.remaining.saturating_sub(quantity);
        self.total_quantity = self.total_quantity.saturating_sub(quantity);

        if entry.remaining.is_zero() {
            let _ = self.orders.remove(index);
        }
    }

    /// Total resting quantity not owned by `user_id`
    ///
    /// Self-trade prevention means a taker can never consume its own
    /// entries; fill-or-kill feasibility uses this sum.
    pub fn quantity_excluding(&self, user_id: UserId) -> Quantity {
        self.orders
            .iter()
            .filter(|entry| entry.user_id != user_id)
            .fold(Quantity::zero(), |acc, entry| acc + entry.remaining)
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the total quantity at this price level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
