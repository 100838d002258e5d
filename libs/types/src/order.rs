//! Order lifecycle types

use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Primitive order type seen by the matching engine
///
/// Richer intents (stop-limit, OCO) are normalized into these at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Execute at the given price or better; remainder may rest
    Limit,
    /// Execute against whatever the book offers; never rests
    Market,
}

/// Time-in-force policy for the unfilled remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-Till-Cancel: remainder rests until filled or explicitly cancelled
    GTC,
    /// Immediate-Or-Cancel: match immediately, cancel remainder
    IOC,
    /// Fill-Or-Kill: full match or cancel entirely with zero trades
    FOK,
}

/// Order status
///
/// Transitions are monotonic; terminal states never revert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    /// Admitted, nothing filled yet
    #[serde(rename = "NEW")]
    New,

    /// Some quantity filled, remainder open
    #[serde(rename = "PARTIALLY_FILLED")]
    PartiallyFilled,

    /// Completely filled (terminal)
    #[serde(rename = "FILLED")]
    Filled,

    /// Cancelled by user or engine (terminal)
    #[serde(rename = "CANCELLED")]
    Cancelled(CancelReason),

    /// Failed admission (terminal); never persisted
    #[serde(rename = "REJECTED")]
    Rejected(RejectReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled(_) | OrderStatus::Rejected(_)
        )
    }

    /// Check if the order still occupies book/ledger resources
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

/// Cancel reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequested,
    /// IOC or market remainder after matching stopped
    UnfilledRemainder,
    /// Market order found no counterparty at all
    NoLiquidity,
    /// FOK order could not be filled in full
    FillOrKill,
    /// The other leg of an OCO pair triggered or filled
    OcoSibling,
}

/// Reject reasons surfaced to the submitting caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    UnknownSymbol,
    SymbolSuspended,
    InvalidPrice,
    InvalidAmount,
    BelowMinAmount,
    BelowMinNotional,
    RateLimited,
    MaxOpenOrders,
    InsufficientBalance,
}

/// An order submission as received from the (already authenticated) caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Present for limit orders, absent for market orders
    pub price: Option<Price>,
    pub amount: Quantity,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Build a GTC limit order request
    pub fn limit(user_id: UserId, symbol: Symbol, side: Side, price: Price, amount: Quantity) -> Self {
        Self {
            user_id,
            symbol,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            amount,
            time_in_force: TimeInForce::GTC,
        }
    }

    /// Build a market order request
    pub fn market(user_id: UserId, symbol: Symbol, side: Side, amount: Quantity) -> Self {
        Self {
            user_id,
            symbol,
            side,
            order_type: OrderType::Market,
            price: None,
            amount,
            time_in_force: TimeInForce::IOC,
        }
    }

    /// Override the time-in-force policy
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }
}

/// Complete order structure
///
/// Created on admission; mutated only by the matching engine (fills) or by
/// explicit cancel. Durable records are never physically removed, only the
/// in-memory book entry is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    /// Present for limit orders, absent for market orders
    pub price: Option<Price>,
    /// Original amount
    pub amount: Quantity,
    pub filled: Quantity,
    pub remaining: Quantity,
    /// Remaining frozen collateral backing this order, in the frozen currency
    /// (quote for buys, base for sells)
    pub reserved: Decimal,
    pub status: OrderStatus,
    /// Global admission sequence; book priority at equal price
    pub sequence: u64,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
    pub version: u64,    // Optimistic locking
}

impl Order {
    /// Create a new open order from an admitted request
    pub fn new(request: &OrderRequest, sequence: u64, reserved: Decimal, timestamp: i64) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id: request.user_id,
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            time_in_force: request.time_in_force,
            price: request.price,
            amount: request.amount,
            filled: Quantity::zero(),
            remaining: request.amount,
            reserved,
            status: OrderStatus::New,
            sequence,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    /// Check quantity invariant: filled + remaining = original
    pub fn check_invariant(&self) -> bool {
        self.filled.as_decimal() + self.remaining.as_decimal() == self.amount.as_decimal()
            && self.reserved >= Decimal::ZERO
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled == self.amount
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled.is_zero()
    }

    /// Update filled quantity and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed total quantity or violate invariants
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot fill terminal order");

        let new_filled = self.filled + fill_quantity;
        assert!(
            new_filled.as_decimal() <= self.amount.as_decimal(),
            "Fill would exceed order quantity"
        );

        self.filled = new_filled;
        self.remaining = self.amount.saturating_sub(new_filled);

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::PartiallyFilled;
        }

        self.updated_at = timestamp;
        self.version += 1;

        assert!(self.check_invariant(), "Invariant violated after fill");
    }

    /// Release part of the frozen collateral backing this order
    ///
    /// # Panics
    /// Panics if the release exceeds the remaining reserve
    pub fn consume_reserve(&mut self, amount: Decimal) {
        assert!(amount >= Decimal::ZERO, "Reserve release must be non-negative");
        assert!(amount <= self.reserved, "Reserve release exceeds remaining reserve");
        self.reserved -= amount;
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn cancel(&mut self, reason: CancelReason, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");

        self.status = OrderStatus::Cancelled(reason);
        self.updated_at = timestamp;
        self.version += 1;
    }
}
