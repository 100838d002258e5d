//! Order intents and their normalization
//!
//! Callers submit intents; the matching engine only ever sees primitive
//! limit/market orders. Normalization turns an intent into at most one
//! immediate order request plus zero or more watch conditions that fire on
//! the executed-trade price stream and re-enter admission as primitive
//! orders.

use crate::ids::{OrderId, Symbol, UserId, WatchId};
use crate::numeric::{Price, Quantity};
use crate::order::{OrderRequest, Side, TimeInForce};
use serde::{Deserialize, Serialize};

/// The closed set of order intents accepted at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderIntent {
    /// Plain limit order
    #[serde(rename = "LIMIT")]
    Limit {
        price: Price,
        time_in_force: TimeInForce,
    },

    /// Plain market order
    #[serde(rename = "MARKET")]
    Market,

    /// Rests off-book until the market trades through `stop`, then places a
    /// limit order at `price`
    #[serde(rename = "STOP_LIMIT")]
    StopLimit {
        stop: Price,
        price: Price,
        time_in_force: TimeInForce,
    },

    /// One-cancels-other: an immediate limit leg at `price` plus a stop leg
    /// that places a limit at `stop_limit` when the market trades through
    /// `stop`; either leg completing cancels the other
    #[serde(rename = "OCO")]
    Oco {
        price: Price,
        stop: Price,
        stop_limit: Price,
    },
}

/// Which way the last-trade price must cross the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerDirection {
    RisesAbove,
    FallsBelow,
}

impl TriggerDirection {
    /// Conventional stop direction: buy stops arm above the market,
    /// sell stops below.
    pub fn for_stop(side: Side) -> Self {
        match side {
            Side::BUY => TriggerDirection::RisesAbove,
            Side::SELL => TriggerDirection::FallsBelow,
        }
    }
}

/// A dormant condition armed against the executed-trade price stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchCondition {
    pub watch_id: WatchId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub trigger: Price,
    pub direction: TriggerDirection,
    /// Limit price of the order placed when the watch fires
    pub limit_price: Price,
    pub time_in_force: TimeInForce,
    pub amount: Quantity,
    /// OCO linkage: resting sibling order cancelled when this watch fires
    pub oco_sibling: Option<OrderId>,
    pub created_at: i64,
}

impl WatchCondition {
    /// Check the watch against an executed trade price
    pub fn should_trigger(&self, last_price: Price) -> bool {
        match self.direction {
            TriggerDirection::RisesAbove => last_price >= self.trigger,
            TriggerDirection::FallsBelow => last_price <= self.trigger,
        }
    }

    /// The primitive order this watch places when it fires
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest::limit(
            self.user_id,
            self.symbol.clone(),
            self.side,
            self.limit_price,
            self.amount,
        )
        .with_time_in_force(self.time_in_force)
    }
}

/// Result of normalizing an intent
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedIntent {
    /// Order to admit right now, if the intent has an immediate leg
    pub immediate: Option<OrderRequest>,
    /// Watches to arm against the trade stream
    pub watches: Vec<WatchCondition>,
}

/// Normalize an intent into primitive orders and watch conditions
pub fn normalize(
    user_id: UserId,
    symbol: Symbol,
    side: Side,
    amount: Quantity,
    intent: OrderIntent,
    timestamp: i64,
) -> NormalizedIntent {
    match intent {
        OrderIntent::Limit {
            price,
            time_in_force,
        } => NormalizedIntent {
            immediate: Some(
                OrderRequest::limit(user_id, symbol, side, price, amount)
                    .with_time_in_force(time_in_force),
            ),
            watches: Vec::new(),
        },

        OrderIntent::Market => NormalizedIntent {
            immediate: Some(OrderRequest::market(user_id, symbol, side, amount)),
            watches: Vec::new(),
        },

        OrderIntent::StopLimit {
            stop,
            price,
            time_in_force,
        } => NormalizedIntent {
            immediate: None,
            watches: vec![WatchCondition {
                watch_id: WatchId::new(),
                user_id,
                symbol,
                side,
                trigger: stop,
                direction: TriggerDirection::for_stop(side),
                limit_price: price,
                time_in_force,
                amount,
                oco_sibling: None,
                created_at: timestamp,
            }],
        },

        OrderIntent::Oco {
            price,
            stop,
            stop_limit,
        } => NormalizedIntent {
            immediate: Some(OrderRequest::limit(
                user_id,
                symbol.clone(),
                side,
                price,
                amount,
            )),
            watches: vec![WatchCondition {
                watch_id: WatchId::new(),
                user_id,
                symbol,
                side,
                trigger: stop,
                direction: TriggerDirection::for_stop(side),
                limit_price: stop_limit,
                time_in_force: TimeInForce::GTC,
                amount,
                // Sibling is wired once the immediate leg is admitted
                oco_sibling: None,
                created_at: timestamp,
            }],
        },
    }
}
