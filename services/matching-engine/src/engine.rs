//! Matching engine core
//!
//! Walks the opposite side of a symbol's book in price-time priority for
//! each admitted taker order, consulting the circuit breaker before every
//! candidate price and settling each decided trade against the ledger
//! before reporting it. The caller holds the symbol's pipeline lock, so a
//! taker is processed to completion before the next order of that symbol.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use ledger::{Ledger, LedgerError};
use types::numeric::{notional, Quantity};
use types::order::{CancelReason, Order, OrderType, Side, TimeInForce};
use types::pair::TradingPair;
use types::trade::Trade;

use crate::book::SymbolBook;
use crate::breaker::{BreakerVerdict, CircuitBreaker};
use crate::matching::executor::MatchExecutor;

/// Matching errors
///
/// Settlement failures are fatal to the taker's processing; validation and
/// policy problems never reach the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("settlement failed: {0}")]
    Settlement(#[from] LedgerError),
}

/// Result of processing one taker order
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Executed trades, in sequence order
    pub trades: Vec<Trade>,
    /// True if the circuit breaker stopped matching early
    pub halted: bool,
}

/// Process an admitted taker order against the book
///
/// On return the taker order carries its final status: filled, resting
/// (inserted into the book), or cancelled per its type and time-in-force.
/// Maker fills are visible through the returned trades; the caller updates
/// its durable maker records from them.
pub fn process(
    taker: &mut Order,
    book: &mut SymbolBook,
    breaker: &mut CircuitBreaker,
    executor: &MatchExecutor,
    ledger: &Ledger,
    pair: &TradingPair,
    now: i64,
) -> Result<MatchOutcome, EngineError> {
    let mut trades = Vec::new();
    let mut halted = false;

    // Fill-or-kill feasibility: visible counterparty quantity within the
    // limit, excluding the taker's own resting orders
    if taker.time_in_force == TimeInForce::FOK {
        let available = book.opposite_available(taker.side, taker.price, taker.user_id);
        if available < taker.remaining {
            debug!(order_id = %taker.order_id, %available, "fill-or-kill not fillable");
            taker.cancel(CancelReason::FillOrKill, now);
            release_reserve(taker, ledger, pair, now);
            return Ok(MatchOutcome { trades, halted });
        }
    }

    'prices: for price in book.opposite_prices(taker.side, taker.price) {
        if taker.remaining.is_zero() {
            break;
        }

        // Breaker rules on the candidate trade price; a halt abandons
        // matching for this taker entirely
        if breaker.check(price, pair, now) == BreakerVerdict::Halt {
            halted = true;
            break 'prices;
        }

        let mut index = 0;
        loop {
            if taker.remaining.is_zero() {
                break 'prices;
            }

            let entry = {
                let Some(level) = book.opposite_level_mut(taker.side, price) else {
                    break;
                };
                match level.entry_at(index) {
                    Some(entry) => entry.clone(),
                    None => break,
                }
            };

            // Self-trade prevention: skip the maker, leave it resting
            if entry.user_id == taker.user_id {
                index += 1;
                continue;
            }

            let mut quantity = taker.remaining.min(entry.remaining);

            // A market buy spends a frozen quote reserve rather than a
            // fixed quantity; cap the fill by what the reserve affords at
            // this price
            if taker.side == Side::BUY && taker.order_type == OrderType::Market {
                let affordable = Quantity::new(taker.reserved / price.as_decimal())
                    .truncate_to_scale(pair.amount_precision);
                quantity = quantity.min(affordable);
                if quantity.is_zero() {
                    break 'prices;
                }
            }

            let trade = executor.execute_trade(pair, &entry, taker, price, quantity, now);

            // Taker reserve accounting: a buy-limit reserve was taken at
            // the limit price, so executing at a better maker price frees
            // the difference
            let spend = match taker.side {
                Side::BUY => notional(price, quantity),
                Side::SELL => quantity.as_decimal(),
            };
            let reserve_consumed = match (taker.side, taker.order_type) {
                (Side::BUY, OrderType::Limit) => {
                    let limit = taker.price.expect("limit order has a price");
                    notional(limit, quantity)
                }
                _ => spend,
            };
            let refund = reserve_consumed - spend;

            ledger.settle_trade(&trade, pair, refund, now)?;

            taker.add_fill(quantity, now);
            taker.consume_reserve(reserve_consumed);
            {
                let level = book
                    .opposite_level_mut(taker.side, price)
                    .expect("level exists while entries remain");
                level.fill_at(index, quantity);
            }
            breaker.on_trade(price, now);

            info!(
                trade_id = %trade.trade_id,
                symbol = %trade.symbol,
                %price,
                amount = %quantity,
                maker = %trade.maker_order_id,
                taker = %trade.taker_order_id,
                "trade executed"
            );
            trades.push(trade);
        }

        book.prune_opposite_level(taker.side, price);
    }

    finalize(taker, book, ledger, pair, !trades.is_empty(), now);
    Ok(MatchOutcome { trades, halted })
}

/// Resolve the taker's final state after matching stops
fn finalize(
    taker: &mut Order,
    book: &mut SymbolBook,
    ledger: &Ledger,
    pair: &TradingPair,
    any_fills: bool,
    now: i64,
) {
    if taker.is_filled() {
        release_reserve(taker, ledger, pair, now);
        return;
    }

    match taker.order_type {
        OrderType::Market => {
            let reason = if any_fills {
                CancelReason::UnfilledRemainder
            } else {
                CancelReason::NoLiquidity
            };
            taker.cancel(reason, now);
            release_reserve(taker, ledger, pair, now);
        }
        OrderType::Limit => match taker.time_in_force {
            TimeInForce::GTC => book.insert(taker),
            TimeInForce::IOC => {
                taker.cancel(CancelReason::UnfilledRemainder, now);
                release_reserve(taker, ledger, pair, now);
            }
            // Reachable only when the breaker halted a feasible FOK
            TimeInForce::FOK => {
                taker.cancel(CancelReason::FillOrKill, now);
                release_reserve(taker, ledger, pair, now);
            }
        },
    }
}

/// Unfreeze whatever reserve the order still holds
fn release_reserve(taker: &mut Order, ledger: &Ledger, pair: &TradingPair, now: i64) {
    if taker.reserved > Decimal::ZERO {
        let currency = frozen_currency(taker.side, pair);
        ledger.unfreeze(taker.user_id, currency, taker.reserved, now);
        let leftover = taker.reserved;
        taker.consume_reserve(leftover);
    }
}

/// Currency an order's reserve is held in
pub fn frozen_currency(side: Side, pair: &TradingPair) -> &str {
    match side {
        Side::BUY => &pair.quote,
        Side::SELL => &pair.base,
    }
}
