//! Exchange core facade
//!
//! Wires the risk gate, sequencer, per-symbol books, circuit breakers,
//! matching engine, ledger, durable store, watch list, and event sink into
//! the synchronous operations the external API layer calls.
//!
//! Lock discipline: the symbol pipeline lock is taken first and the
//! per-user admission lock (inside the gate) second; ledger slots lock
//! independently per (user, currency). Watch triggers run after the
//! pipeline lock is released so a triggered order re-enters submission
//! like any other.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ledger::{Balance, Ledger, LedgerError};
use matching_engine::book::SymbolBook;
use matching_engine::breaker::CircuitBreaker;
use matching_engine::engine::{self, frozen_currency};
use matching_engine::events::{MarketEvent, MarketEventPayload};
use matching_engine::matching::executor::MatchExecutor;
use risk_engine::{RiskGate, RiskGateConfig};
use types::errors::{CoreError, PolicyError, ValidationError};
use types::ids::{OrderId, Symbol, UserId, WatchId};
use types::intent::{normalize, OrderIntent};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, OrderRequest, OrderStatus, Side};
use types::pair::PairRegistry;
use types::sequence::Sequencer;
use types::trade::Trade;

use crate::events::EventSink;
use crate::store::OrderStore;
use crate::watch::WatchList;

/// Current wall-clock time in Unix nanoseconds
///
/// Every core operation takes an explicit timestamp; this is the
/// convenience source for callers at the outermost layer.
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// Result of a synchronous order submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub filled: Quantity,
    pub remaining: Quantity,
    pub trades: Vec<Trade>,
}

/// Result of a cancel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub order_id: OrderId,
    /// Reserve returned to the user's available balance
    pub unfrozen: Decimal,
}

/// Price-aggregated book snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// Result of submitting a (possibly compound) order intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    /// Outcome of the immediate leg, if the intent had one
    pub order: Option<OrderResult>,
    /// Watches armed for the deferred legs
    pub watch_ids: Vec<WatchId>,
}

/// One symbol's single-writer matching state
#[derive(Debug, Default)]
pub(crate) struct SymbolPipeline {
    pub book: SymbolBook,
    pub breaker: CircuitBreaker,
}

/// The exchange core
pub struct ExchangeCore {
    pub(crate) pairs: PairRegistry,
    pub(crate) ledger: Arc<Ledger>,
    pub(crate) gate: RiskGate,
    pub(crate) sequencer: Arc<Sequencer>,
    executor: MatchExecutor,
    pub(crate) store: Arc<OrderStore>,
    pub(crate) pipelines: DashMap<String, Arc<Mutex<SymbolPipeline>>>,
    sink: Arc<dyn EventSink>,
    pub(crate) watches: WatchList,
}

impl ExchangeCore {
    /// Create a core with default risk limits
    pub fn new(pairs: PairRegistry, ledger: Arc<Ledger>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(pairs, ledger, sink, RiskGateConfig::default())
    }

    /// Create a core with custom risk limits
    pub fn with_config(
        pairs: PairRegistry,
        ledger: Arc<Ledger>,
        sink: Arc<dyn EventSink>,
        config: RiskGateConfig,
    ) -> Self {
        Self::from_parts(
            pairs,
            ledger,
            Arc::new(OrderStore::new()),
            sink,
            config,
            Arc::new(Sequencer::new()),
        )
    }

    pub(crate) fn from_parts(
        pairs: PairRegistry,
        ledger: Arc<Ledger>,
        store: Arc<OrderStore>,
        sink: Arc<dyn EventSink>,
        config: RiskGateConfig,
        sequencer: Arc<Sequencer>,
    ) -> Self {
        Self {
            pairs,
            ledger,
            gate: RiskGate::new(config),
            sequencer: Arc::clone(&sequencer),
            executor: MatchExecutor::new(sequencer),
            store,
            pipelines: DashMap::new(),
            sink,
            watches: WatchList::new(),
        }
    }

    /// The durable order/trade record store
    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// The balance ledger
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    // ── Submission ──────────────────────────────────────────────────

    /// Submit a primitive limit/market order, synchronous through matching
    /// and settlement.
    pub fn submit_order(&self, request: OrderRequest, now: i64) -> Result<OrderResult, CoreError> {
        let pair = self.pairs.get(&request.symbol).cloned().ok_or_else(|| {
            ValidationError::UnknownSymbol {
                symbol: request.symbol.as_str().to_string(),
            }
        })?;

        let pipeline = self.pipeline(&request.symbol);
        let (result, last_price) = {
            let mut pipe = pipeline.lock().expect("symbol pipeline poisoned");

            let best = pipe.book.best_opposite_price(request.side);
            let mut order =
                self.gate
                    .admit(&request, &pair, best, &self.ledger, &self.sequencer, now)?;

            // Durable record precedes matching; the book is rebuilt from it
            self.store.insert_order(order.clone());
            self.sink.publish(MarketEvent {
                sequence: order.sequence,
                timestamp: now,
                payload: MarketEventPayload::OrderAccepted {
                    order_id: order.order_id,
                    user_id: order.user_id,
                    symbol: order.symbol.clone(),
                    side: order.side,
                    price: order.price,
                    amount: order.amount,
                },
            });

            let pipe = &mut *pipe;
            let outcome = engine::process(
                &mut order,
                &mut pipe.book,
                &mut pipe.breaker,
                &self.executor,
                &self.ledger,
                &pair,
                now,
            )
            .map_err(|e| {
                error!(order_id = %order.order_id, error = %e, "matching aborted");
                CoreError::System {
                    message: e.to_string(),
                }
            })?;

            let final_order = order.clone();
            self.store.update_order(&order.order_id, move |stored| *stored = final_order);

            for trade in &outcome.trades {
                self.store.record_trade(trade.clone());
                self.store.mark_trade_settled(trade.trade_id, now);
                self.apply_maker_fill(trade, now);
                self.sink.publish(MarketEvent::trade_executed(trade));
            }

            if !order.status.is_open() {
                self.gate.release_open(order.user_id);
                if let OrderStatus::Cancelled(reason) = &order.status {
                    self.publish_cancelled(
                        order.order_id,
                        order.user_id,
                        &order.symbol,
                        *reason,
                        order.filled,
                        order.remaining,
                        now,
                    );
                }
                self.watches.drop_for_sibling(order.order_id);
            }

            let last_price = outcome.trades.last().map(|trade| trade.price);
            (
                OrderResult {
                    order_id: order.order_id,
                    status: order.status.clone(),
                    filled: order.filled,
                    remaining: order.remaining,
                    trades: outcome.trades,
                },
                last_price,
            )
        };

        // Executed prices may arm stop/OCO legs; run them outside the lock
        if let Some(price) = last_price {
            self.process_triggers(&request.symbol, price, now);
        }
        Ok(result)
    }

    /// Submit an order intent: the immediate leg goes through `submit_order`,
    /// deferred legs arm watch conditions on the trade stream.
    pub fn submit_intent(
        &self,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        amount: Quantity,
        intent: OrderIntent,
        now: i64,
    ) -> Result<IntentResult, CoreError> {
        let normalized = normalize(user_id, symbol, side, amount, intent, now);
        let is_oco = normalized.immediate.is_some() && !normalized.watches.is_empty();

        let mut order = None;
        let mut sibling = None;
        if let Some(request) = normalized.immediate {
            let result = self.submit_order(request, now)?;
            if result.status.is_open() {
                sibling = Some(result.order_id);
            }
            order = Some(result);
        }

        let mut watch_ids = Vec::new();
        // An OCO whose limit leg already completed arms nothing
        if !(is_oco && sibling.is_none()) {
            for mut watch in normalized.watches {
                watch.oco_sibling = sibling;
                info!(
                    watch_id = %watch.watch_id,
                    symbol = %watch.symbol,
                    trigger = %watch.trigger,
                    "watch armed"
                );
                watch_ids.push(watch.watch_id);
                self.watches.add(watch);
            }
        }

        Ok(IntentResult { order, watch_ids })
    }

    // ── Cancellation ────────────────────────────────────────────────

    /// Cancel a still-resting order and unfreeze its remaining reserve
    pub fn cancel_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        now: i64,
    ) -> Result<CancelResult, CoreError> {
        self.cancel_internal(user_id, order_id, CancelReason::UserRequested, now)
    }

    /// Cancel every open order of a user on a symbol; returns the count
    pub fn cancel_all(&self, user_id: UserId, symbol: &Symbol, now: i64) -> usize {
        self.store
            .open_orders_for(user_id, Some(symbol))
            .into_iter()
            .filter(|order| {
                self.cancel_internal(user_id, order.order_id, CancelReason::UserRequested, now)
                    .is_ok()
            })
            .count()
    }

    fn cancel_internal(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: CancelReason,
        now: i64,
    ) -> Result<CancelResult, CoreError> {
        let existing = self
            .store
            .get_order(&order_id)
            .ok_or(CoreError::NotFound(order_id))?;
        if existing.user_id != user_id {
            return Err(CoreError::Forbidden);
        }
        let pair = self.pairs.get(&existing.symbol).cloned().ok_or_else(|| {
            ValidationError::UnknownSymbol {
                symbol: existing.symbol.as_str().to_string(),
            }
        })?;

        let pipeline = self.pipeline(&existing.symbol);
        let mut pipe = pipeline.lock().expect("symbol pipeline poisoned");

        // Re-read under the symbol lock; fills race with cancellation
        let order = self
            .store
            .get_order(&order_id)
            .ok_or(CoreError::NotFound(order_id))?;
        if !order.status.is_open() {
            return Err(CoreError::NotCancellable {
                status: format!("{:?}", order.status),
            });
        }

        if let Some(price) = order.price {
            pipe.book.remove(order.side, &order_id, price);
        }

        let unfrozen = order.reserved;
        if unfrozen > Decimal::ZERO {
            self.ledger
                .unfreeze(order.user_id, frozen_currency(order.side, &pair), unfrozen, now);
        }
        self.store.update_order(&order_id, |stored| {
            let leftover = stored.reserved;
            stored.consume_reserve(leftover);
            stored.cancel(reason, now);
        });
        self.gate.release_open(user_id);
        self.watches.drop_for_sibling(order_id);

        info!(order_id = %order_id, ?reason, %unfrozen, "order cancelled");
        self.publish_cancelled(
            order_id,
            order.user_id,
            &order.symbol,
            reason,
            order.filled,
            order.remaining,
            now,
        );

        Ok(CancelResult { order_id, unfrozen })
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Book depth aggregated by price, best levels first
    pub fn get_depth(&self, symbol: &Symbol, levels: usize) -> Result<Depth, CoreError> {
        self.pairs.get(symbol).ok_or_else(|| ValidationError::UnknownSymbol {
            symbol: symbol.as_str().to_string(),
        })?;
        let pipeline = self.pipeline(symbol);
        let pipe = pipeline.lock().expect("symbol pipeline poisoned");
        Ok(Depth {
            bids: pipe.book.bids.depth_snapshot(levels),
            asks: pipe.book.asks.depth_snapshot(levels),
        })
    }

    /// A user's balance in one currency
    pub fn get_balance(&self, user_id: UserId, currency: &str) -> Balance {
        self.ledger.balance(user_id, currency)
    }

    /// A user's order record
    pub fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderResult, CoreError> {
        let order = self
            .store
            .get_order(&order_id)
            .ok_or(CoreError::NotFound(order_id))?;
        if order.user_id != user_id {
            return Err(CoreError::Forbidden);
        }
        Ok(OrderResult {
            order_id: order.order_id,
            status: order.status,
            filled: order.filled,
            remaining: order.remaining,
            trades: Vec::new(),
        })
    }

    // ── Wallet surface ──────────────────────────────────────────────

    /// Deposit funds into a user's available balance
    pub fn deposit(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        now: i64,
    ) -> Result<(), CoreError> {
        self.ledger
            .deposit(user_id, currency, amount, now)
            .map_err(map_ledger_error)
    }

    /// Withdraw funds from a user's available balance
    pub fn withdraw(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        now: i64,
    ) -> Result<(), CoreError> {
        self.ledger
            .withdraw(user_id, currency, amount, now)
            .map_err(map_ledger_error)
    }

    // ── Internal ────────────────────────────────────────────────────

    pub(crate) fn pipeline(&self, symbol: &Symbol) -> Arc<Mutex<SymbolPipeline>> {
        self.pipelines
            .entry(symbol.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SymbolPipeline::default())))
            .clone()
    }

    /// Apply one trade's maker-side fill to the durable maker record
    fn apply_maker_fill(&self, trade: &Trade, now: i64) {
        let consumed = match trade.taker_side {
            // Taker bought, so the maker sold base from its reserve
            Side::BUY => trade.amount.as_decimal(),
            // Taker sold, so the maker paid quote at its own price
            Side::SELL => trade.trade_value(),
        };
        self.store.update_order(&trade.maker_order_id, |maker| {
            maker.add_fill(trade.amount, now);
            maker.consume_reserve(consumed);
        });

        if let Some(maker) = self.store.get_order(&trade.maker_order_id) {
            if !maker.status.is_open() {
                self.gate.release_open(maker.user_id);
                self.watches.drop_for_sibling(maker.order_id);
            }
        }
    }

    /// Fire watches armed on a symbol after trades executed at `last_price`
    fn process_triggers(&self, symbol: &Symbol, last_price: Price, now: i64) {
        for watch in self.watches.take_triggered(symbol, last_price) {
            info!(
                watch_id = %watch.watch_id,
                symbol = %watch.symbol,
                trigger = %watch.trigger,
                %last_price,
                "watch triggered"
            );

            if let Some(sibling) = watch.oco_sibling {
                if let Err(e) =
                    self.cancel_internal(watch.user_id, sibling, CancelReason::OcoSibling, now)
                {
                    warn!(order_id = %sibling, error = %e, "sibling cancel skipped");
                }
            }

            if let Err(e) = self.submit_order(watch.to_request(), now) {
                warn!(watch_id = %watch.watch_id, error = %e, "triggered order rejected");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn publish_cancelled(
        &self,
        order_id: OrderId,
        user_id: UserId,
        symbol: &Symbol,
        reason: CancelReason,
        filled: Quantity,
        unfilled: Quantity,
        now: i64,
    ) {
        self.sink.publish(MarketEvent {
            sequence: self.sequencer.next(),
            timestamp: now,
            payload: MarketEventPayload::OrderCancelled {
                order_id,
                user_id,
                symbol: symbol.clone(),
                reason,
                filled,
                unfilled,
            },
        });
    }
}

fn map_ledger_error(error: LedgerError) -> CoreError {
    match error {
        LedgerError::InsufficientAvailable {
            currency,
            required,
            available,
        } => PolicyError::InsufficientBalance {
            currency,
            required,
            available,
        }
        .into(),
        LedgerError::NonPositiveAmount(_) => ValidationError::NonPositiveAmount.into(),
        other => CoreError::System {
            message: other.to_string(),
        },
    }
}
