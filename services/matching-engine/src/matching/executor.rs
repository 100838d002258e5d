//! Trade construction
//!
//! Builds trade records for decided matches: sequence assignment and fee
//! calculation. Fees are charged in the currency each party receives:
//! the maker's fee on the maker's received amount at the maker rate, the
//! taker's likewise at the taker rate.

use std::sync::Arc;

use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::pair::TradingPair;
use types::sequence::Sequencer;
use types::trade::Trade;

use crate::book::LevelEntry;

/// Trade factory sharing the process-wide sequencer
#[derive(Debug, Clone)]
pub struct MatchExecutor {
    sequencer: Arc<Sequencer>,
}

impl MatchExecutor {
    pub fn new(sequencer: Arc<Sequencer>) -> Self {
        Self { sequencer }
    }

    /// Build the trade for a decided match
    ///
    /// `price` is the maker's resting price; `quantity` has already been
    /// capped by both parties' remainders.
    pub fn execute_trade(
        &self,
        pair: &TradingPair,
        maker: &LevelEntry,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Trade {
        debug_assert!(
            maker.user_id != taker.user_id,
            "self-trade candidates are skipped before execution"
        );

        let qty = quantity.as_decimal();
        let value = qty * price.as_decimal();

        // Fee base is the amount each party receives
        let (maker_fee, maker_fee_currency, taker_fee, taker_fee_currency) = match taker.side {
            // Taker buys: maker receives quote, taker receives base
            Side::BUY => (
                pair.maker_fee(value),
                pair.quote.clone(),
                pair.taker_fee(qty),
                pair.base.clone(),
            ),
            // Taker sells: maker receives base, taker receives quote
            Side::SELL => (
                pair.maker_fee(qty),
                pair.base.clone(),
                pair.taker_fee(value),
                pair.quote.clone(),
            ),
        };

        Trade::new(
            self.sequencer.next(),
            taker.symbol.clone(),
            maker.order_id,
            taker.order_id,
            maker.user_id,
            taker.user_id,
            taker.side,
            price,
            quantity,
            maker_fee,
            maker_fee_currency,
            taker_fee,
            taker_fee_currency,
            timestamp,
        )
    }
}
