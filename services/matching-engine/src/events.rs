//! Event structures emitted by the matching pipeline
//!
//! One event per order lifecycle transition and per executed trade. Events
//! carry the global sequence so downstream consumers (tickers, candle
//! builders, publish/subscribe fan-out) can totally order them without
//! caring about transport.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol, TradeId, UserId};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Side};
use types::trade::Trade;

/// An event on the core's outbound stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Global monotonic sequence
    pub sequence: u64,
    /// Unix nanoseconds
    pub timestamp: i64,
    pub payload: MarketEventPayload,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum MarketEventPayload {
    /// An order passed admission and entered the matching pipeline
    OrderAccepted {
        order_id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        price: Option<Price>,
        amount: Quantity,
    },

    /// A trade was executed between maker and taker
    TradeExecuted {
        trade_id: TradeId,
        symbol: Symbol,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_user_id: UserId,
        taker_user_id: UserId,
        price: Price,
        amount: Quantity,
        /// Side from taker perspective
        taker_side: Side,
        executed_at: i64,
    },

    /// An order left the book without completing
    OrderCancelled {
        order_id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        reason: CancelReason,
        filled: Quantity,
        unfilled: Quantity,
    },
}

impl MarketEvent {
    /// Build the trade event for an executed trade, carrying the trade's
    /// own sequence.
    pub fn trade_executed(trade: &Trade) -> Self {
        Self {
            sequence: trade.sequence,
            timestamp: trade.executed_at,
            payload: MarketEventPayload::TradeExecuted {
                trade_id: trade.trade_id,
                symbol: trade.symbol.clone(),
                maker_order_id: trade.maker_order_id,
                taker_order_id: trade.taker_order_id,
                maker_user_id: trade.maker_user_id,
                taker_user_id: trade.taker_user_id,
                price: trade.price,
                amount: trade.amount,
                taker_side: trade.taker_side,
                executed_at: trade.executed_at,
            },
        }
    }
}
