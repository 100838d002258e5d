//! Crash recovery
//!
//! Rebuilds a core from its durable records before it accepts new orders:
//! 1. Restore the sequencer past the highest persisted sequence
//! 2. Complete half-applied settlements; the trade record is authoritative,
//!    and the wallet transaction log tells which legs already reached the
//!    ledger
//! 3. Rebuild every symbol's book from orders with status
//!    `New`/`PartiallyFilled`, in sequence order, preserving original
//!    price-time priority
//! 4. Seed each circuit breaker from the symbol's last recorded trade
//! 5. Restore per-user open-order counts
//!
//! The rebuild is a blocking, one-time pass; the returned core is fully
//! consistent before the first post-restart submission.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use ledger::Ledger;
use risk_engine::RiskGateConfig;
use types::numeric::notional;
use types::order::{OrderType, Side};
use types::pair::PairRegistry;
use types::sequence::Sequencer;
use types::trade::Trade;

use crate::events::EventSink;
use crate::exchange::ExchangeCore;
use crate::store::OrderStore;

/// What a recovery pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Open orders re-inserted into books
    pub orders_restored: usize,
    /// Trades whose settlement was completed during recovery
    pub trades_repaired: usize,
    /// First sequence number the resumed core will issue
    pub next_sequence: u64,
}

impl ExchangeCore {
    /// Reconstruct a core from durable state
    pub fn recover(
        pairs: PairRegistry,
        ledger: Arc<Ledger>,
        store: Arc<OrderStore>,
        sink: Arc<dyn EventSink>,
        config: RiskGateConfig,
        now: i64,
    ) -> (Self, RecoveryReport) {
        let next_sequence = store.max_sequence() + 1;
        info!(next_sequence, "recovery started");

        let core = Self::from_parts(
            pairs,
            Arc::clone(&ledger),
            Arc::clone(&store),
            sink,
            config,
            Arc::new(Sequencer::starting_at(next_sequence)),
        );

        // Settlement repair: re-run every trade still `Matched`; legs already
        // in the transaction log are skipped inside the ledger
        let mut trades_repaired = 0;
        for trade in store.unsettled_trades() {
            let Some(pair) = core.pairs.get(&trade.symbol).cloned() else {
                warn!(trade_id = %trade.trade_id, symbol = %trade.symbol, "unknown pair in trade record");
                continue;
            };
            let refund = taker_refund(&store, &trade);
            match ledger.settle_trade(&trade, &pair, refund, now) {
                Ok(()) => {
                    store.mark_trade_settled(trade.trade_id, now);
                    trades_repaired += 1;
                }
                Err(e) => {
                    warn!(trade_id = %trade.trade_id, error = %e, "settlement repair failed");
                }
            }
        }

        // Book rebuild in sequence order
        let open_orders = store.open_orders();
        let orders_restored = open_orders.len();
        for order in &open_orders {
            let pipeline = core.pipeline(&order.symbol);
            let mut pipe = pipeline.lock().expect("symbol pipeline poisoned");
            pipe.book.insert(order);
        }

        // Breaker references from the last recorded trade per symbol
        for pair in core.pairs.symbols() {
            if let Some(trade) = store.last_trade_for(&pair.symbol) {
                let pipeline = core.pipeline(&pair.symbol);
                let mut pipe = pipeline.lock().expect("symbol pipeline poisoned");
                pipe.breaker.seed(trade.price, trade.executed_at);
            }
        }

        // Open-order caps
        for (user_id, count) in store.open_counts() {
            core.gate.set_open_count(user_id, count);
        }

        let report = RecoveryReport {
            orders_restored,
            trades_repaired,
            next_sequence,
        };
        info!(
            orders_restored = report.orders_restored,
            trades_repaired = report.trades_repaired,
            "recovery complete"
        );
        (core, report)
    }
}

/// Price-improvement refund owed to the taker of a recovered trade
///
/// Recomputed from the taker's order record: a buying limit taker reserved
/// at its limit price but paid the maker's price.
fn taker_refund(store: &OrderStore, trade: &Trade) -> Decimal {
    let Some(taker) = store.get_order(&trade.taker_order_id) else {
        return Decimal::ZERO;
    };
    match (taker.side, taker.order_type, taker.price) {
        (Side::BUY, OrderType::Limit, Some(limit)) => {
            notional(limit, trade.amount) - trade.trade_value()
        }
        _ => Decimal::ZERO,
    }
}
