//! Trade execution and settlement types

use crate::ids::{OrderId, Symbol, TradeId, UserId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade settlement state
///
/// A trade is recorded as `Matched` the instant the engine decides it and
/// becomes `Settled` once all four balance legs are applied. Recovery
/// re-settles any trade still `Matched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeState {
    /// Trade created, settlement legs pending or partially applied
    MATCHED,
    /// Fully settled to both parties' balances (terminal)
    SETTLED,
}

/// Complete trade structure
///
/// Represents an atomic exchange between maker and taker. Immutable once
/// created apart from the settlement transition. Trades reference their
/// orders by id; orders never reference trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Global monotonic sequence, shared with orders
    pub sequence: u64,
    pub symbol: Symbol,

    // Order references
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,

    // User references
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,

    /// Side from the taker's perspective
    pub taker_side: Side,
    /// Execution price: always the resting (maker) order's price
    pub price: Price,
    pub amount: Quantity,

    /// Maker fee, denominated in the currency the maker receives
    pub maker_fee: Decimal,
    pub maker_fee_currency: String,
    /// Taker fee, denominated in the currency the taker receives
    pub taker_fee: Decimal,
    pub taker_fee_currency: String,

    pub executed_at: i64, // Unix nanos
    pub settled_at: Option<i64>,

    pub state: TradeState,
}

impl Trade {
    /// Create a new matched trade
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        symbol: Symbol,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_user_id: UserId,
        taker_user_id: UserId,
        taker_side: Side,
        price: Price,
        amount: Quantity,
        maker_fee: Decimal,
        maker_fee_currency: String,
        taker_fee: Decimal,
        taker_fee_currency: String,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            sequence,
            symbol,
            maker_order_id,
            taker_order_id,
            maker_user_id,
            taker_user_id,
            taker_side,
            price,
            amount,
            maker_fee,
            maker_fee_currency,
            taker_fee,
            taker_fee_currency,
            executed_at,
            settled_at: None,
            state: TradeState::MATCHED,
        }
    }

    /// Mark trade as settled
    pub fn settle(&mut self, timestamp: i64) {
        self.state = TradeState::SETTLED;
        self.settled_at = Some(timestamp);
    }

    /// Calculate trade value (price × amount) in the quote currency
    pub fn trade_value(&self) -> Decimal {
        self.amount.as_decimal() * self.price.as_decimal()
    }

    /// Check if trade is settled
    pub fn is_settled(&self) -> bool {
        matches!(self.state, TradeState::SETTLED)
    }

    /// Validate no self-trade
    pub fn validate_no_self_trade(&self) -> bool {
        self.maker_user_id != self.taker_user_id
    }
}
