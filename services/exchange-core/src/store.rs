//! Durable order and trade records
//!
//! The write-behind audit store backing the in-memory books. Orders are
//! never physically removed (terminal states stay queryable) and the
//! trade list is the authoritative settlement record recovery works from.
//! Storage technology is out of scope; this keeps the record-keeping
//! contract in one place.

use std::collections::HashMap;
use std::sync::RwLock;

use dashmap::DashMap;
use types::ids::{OrderId, Symbol, TradeId, UserId};
use types::order::Order;
use types::trade::{Trade, TradeState};

/// Order and trade record store
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<OrderId, Order>,
    trades: RwLock<Vec<Trade>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            trades: RwLock::new(Vec::new()),
        }
    }

    // ── Orders ──────────────────────────────────────────────────────

    /// Persist a new order record
    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.order_id, order);
    }

    /// Copy of an order record
    pub fn get_order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    /// Mutate an order record in place; returns false if unknown
    pub fn update_order<F>(&self, order_id: &OrderId, mutate: F) -> bool
    where
        F: FnOnce(&mut Order),
    {
        match self.orders.get_mut(order_id) {
            Some(mut entry) => {
                mutate(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// All open orders (status `New`/`PartiallyFilled`), ascending sequence
    ///
    /// This is the book-rebuild source: replaying these in sequence order
    /// reproduces original price-time priority.
    pub fn open_orders(&self) -> Vec<Order> {
        let mut open: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.status.is_open())
            .map(|entry| entry.value().clone())
            .collect();
        open.sort_by_key(|order| order.sequence);
        open
    }

    /// Open orders of one user, optionally restricted to a symbol
    pub fn open_orders_for(&self, user_id: UserId, symbol: Option<&Symbol>) -> Vec<Order> {
        let mut open: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| {
                entry.status.is_open()
                    && entry.user_id == user_id
                    && symbol.map(|s| entry.symbol == *s).unwrap_or(true)
            })
            .map(|entry| entry.value().clone())
            .collect();
        open.sort_by_key(|order| order.sequence);
        open
    }

    /// Open-order counts per user (recovery rebuild of the gate's caps)
    pub fn open_counts(&self) -> HashMap<UserId, u32> {
        let mut counts = HashMap::new();
        for entry in self.orders.iter() {
            if entry.status.is_open() {
                *counts.entry(entry.user_id).or_insert(0) += 1;
            }
        }
        counts
    }

    // ── Trades ──────────────────────────────────────────────────────

    /// Append a trade record
    pub fn record_trade(&self, trade: Trade) {
        self.trades.write().expect("trade store poisoned").push(trade);
    }

    /// Mark a trade settled
    pub fn mark_trade_settled(&self, trade_id: TradeId, timestamp: i64) {
        let mut trades = self.trades.write().expect("trade store poisoned");
        if let Some(trade) = trades.iter_mut().rev().find(|t| t.trade_id == trade_id) {
            trade.settle(timestamp);
        }
    }

    /// Copy of all trades, in record order
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.read().expect("trade store poisoned").clone()
    }

    /// Trades whose settlement has not completed (`Matched`)
    pub fn unsettled_trades(&self) -> Vec<Trade> {
        self.trades
            .read()
            .expect("trade store poisoned")
            .iter()
            .filter(|trade| trade.state == TradeState::MATCHED)
            .cloned()
            .collect()
    }

    /// Most recent trade for a symbol, by sequence
    pub fn last_trade_for(&self, symbol: &Symbol) -> Option<Trade> {
        self.trades
            .read()
            .expect("trade store poisoned")
            .iter()
            .filter(|trade| trade.symbol == *symbol)
            .max_by_key(|trade| trade.sequence)
            .cloned()
    }

    /// Highest sequence across all orders and trades
    pub fn max_sequence(&self) -> u64 {
        let order_max = self
            .orders
            .iter()
            .map(|entry| entry.sequence)
            .max()
            .unwrap_or(0);
        let trade_max = self
            .trades
            .read()
            .expect("trade store poisoned")
            .iter()
            .map(|trade| trade.sequence)
            .max()
            .unwrap_or(0);
        order_max.max(trade_max)
    }
}
