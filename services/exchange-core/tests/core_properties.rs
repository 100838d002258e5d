//! End-to-end properties of the exchange core
//!
//! Each test drives the full pipeline (admission → matching → settlement →
//! events) through the public facade.

use std::sync::Arc;

use rust_decimal::Decimal;

use exchange_core::{ExchangeCore, MemoryEventSink};
use ledger::Ledger;
use risk_engine::RiskGateConfig;
use types::errors::{CoreError, PolicyError};
use types::ids::{Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::{OrderRequest, OrderStatus, Side};
use types::pair::{PairRegistry, TradingPair};

const TS: i64 = 1708123456789000000;
const SECOND: i64 = 1_000_000_000;

fn registry() -> PairRegistry {
    let mut pairs = PairRegistry::new();
    pairs.insert(
        TradingPair::new(
            Symbol::new("BTC/USDT"),
            2,
            4,
            Quantity::from_str("0.0001").unwrap(),
            Decimal::from(1),
        )
        .with_fees(10, 20),
    );
    pairs
}

fn new_core() -> (ExchangeCore, Arc<MemoryEventSink>, Arc<Ledger>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let sink = Arc::new(MemoryEventSink::new());
    let ledger = Arc::new(Ledger::new());
    let core = ExchangeCore::new(registry(), Arc::clone(&ledger), sink.clone());
    (core, sink, ledger)
}

fn fund(core: &ExchangeCore, quote: u64, base: u64) -> UserId {
    let user = UserId::new();
    if quote > 0 {
        core.deposit(user, "USDT", Decimal::from(quote), TS).unwrap();
    }
    if base > 0 {
        core.deposit(user, "BTC", Decimal::from(base), TS).unwrap();
    }
    user
}

fn limit(user: UserId, side: Side, price: u64, qty: &str) -> OrderRequest {
    OrderRequest::limit(
        user,
        Symbol::new("BTC/USDT"),
        side,
        Price::from_u64(price),
        Quantity::from_str(qty).unwrap(),
    )
}

fn market(user: UserId, side: Side, qty: &str) -> OrderRequest {
    OrderRequest::market(
        user,
        Symbol::new("BTC/USDT"),
        side,
        Quantity::from_str(qty).unwrap(),
    )
}

#[test]
fn trade_price_is_always_the_makers() {
    let (core, _, _) = new_core();
    let seller = fund(&core, 0, 10);
    let buyer = fund(&core, 1_000_000, 0);

    core.submit_order(limit(seller, Side::SELL, 50000, "1.0"), TS).unwrap();
    // Taker willing to pay up to 51000 still executes at the resting 50000
    let result = core
        .submit_order(limit(buyer, Side::BUY, 51000, "1.0"), TS + 1)
        .unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].price, Price::from_u64(50000));
}

#[test]
fn balances_never_negative_under_concurrent_withdrawals() {
    let (core, _, _) = new_core();
    let core = Arc::new(core);
    let user = fund(&core, 100, 0);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let core = Arc::clone(&core);
        handles.push(std::thread::spawn(move || {
            core.withdraw(user, "USDT", Decimal::from(60), TS + 1).is_ok()
        }));
    }
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // At most one of two overlapping withdrawals for the same funds wins
    assert_eq!(successes, 1);
    let balance = core.get_balance(user, "USDT");
    assert!(balance.available >= Decimal::ZERO);
    assert!(balance.frozen >= Decimal::ZERO);
}

#[test]
fn place_then_cancel_restores_available_exactly() {
    let (core, _, _) = new_core();
    let user = fund(&core, 123_456, 0);
    let before = core.get_balance(user, "USDT").available;

    let placed = core
        .submit_order(limit(user, Side::BUY, 49999, "1.2345"), TS)
        .unwrap();
    assert!(core.get_balance(user, "USDT").available < before);

    core.cancel_order(user, placed.order_id, TS + 1).unwrap();
    assert_eq!(core.get_balance(user, "USDT").available, before);
    assert_eq!(core.get_balance(user, "USDT").frozen, Decimal::ZERO);
}

#[test]
fn price_time_priority_better_price_first() {
    let (core, _, _) = new_core();
    let first = fund(&core, 0, 10);
    let second = fund(&core, 0, 10);
    let buyer = fund(&core, 1_000_000, 0);

    let at_50000 = core.submit_order(limit(first, Side::SELL, 50000, "1.0"), TS).unwrap();
    let at_49999 = core
        .submit_order(limit(second, Side::SELL, 49999, "1.0"), TS + 300_000_000)
        .unwrap();

    let result = core
        .submit_order(market(buyer, Side::BUY, "0.5"), TS + 600_000_000)
        .unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].price, Price::from_u64(49999));
    assert_eq!(result.trades[0].maker_order_id, at_49999.order_id);
    // The worse-priced maker is untouched
    let unfilled = core.store().get_order(&at_50000.order_id).unwrap();
    assert_eq!(unfilled.status, OrderStatus::New);
}

#[test]
fn self_trade_prevention_produces_zero_trades() {
    let (core, _, _) = new_core();
    let user = fund(&core, 1_000_000, 10);

    core.submit_order(limit(user, Side::SELL, 50000, "1.0"), TS).unwrap();
    let result = core
        .submit_order(limit(user, Side::BUY, 50000, "1.0"), TS + 300_000_000)
        .unwrap();

    assert!(result.trades.is_empty());
    // Both of the user's orders keep resting
    let depth = core.get_depth(&Symbol::new("BTC/USDT"), 5).unwrap();
    assert_eq!(depth.asks.len(), 1);
    assert_eq!(depth.bids.len(), 1);
}

#[test]
fn deposits_are_decimal_exact() {
    let (core, _, _) = new_core();
    let user = UserId::new();

    core.deposit(user, "BTC", Decimal::from_str_exact("0.1").unwrap(), TS).unwrap();
    core.deposit(user, "BTC", Decimal::from_str_exact("0.2").unwrap(), TS + 1).unwrap();

    let balance = core.get_balance(user, "BTC");
    assert_eq!(balance.available, Decimal::from_str_exact("0.3").unwrap());
    assert_eq!(balance.available.to_string(), "0.3");
}

#[test]
fn sixth_submission_in_window_is_rate_limited() {
    let (core, _, _) = new_core();
    let user = fund(&core, 1_000_000, 0);

    for i in 0..5 {
        core.submit_order(limit(user, Side::BUY, 40000, "0.01"), TS + i * 1_000_000)
            .unwrap();
    }

    let err = core
        .submit_order(limit(user, Side::BUY, 40000, "0.01"), TS + 5_000_000)
        .unwrap_err();
    assert!(matches!(err, CoreError::Policy(PolicyError::RateLimited { .. })));

    // After the rolling window elapses the user may submit again
    assert!(core
        .submit_order(limit(user, Side::BUY, 40000, "0.01"), TS + SECOND + 5_000_000)
        .is_ok());
}

#[test]
fn open_order_cap_rejects_the_201st() {
    let (core, _, _) = new_core();
    let user = fund(&core, 1_000_000, 0);

    let mut first = None;
    for i in 0..200u32 {
        // Pace submissions to stay inside the rate limit
        let now = TS + i as i64 * 250_000_000;
        let result = core
            .submit_order(limit(user, Side::BUY, 10000, "0.001"), now)
            .unwrap();
        first.get_or_insert(result.order_id);
    }

    let after = TS + 201 * 250_000_000;
    let err = core
        .submit_order(limit(user, Side::BUY, 10000, "0.001"), after)
        .unwrap_err();
    assert!(matches!(err, CoreError::Policy(PolicyError::MaxOpenOrders { .. })));

    // Cancelling an existing order frees a slot
    core.cancel_order(user, first.unwrap(), after + SECOND).unwrap();
    assert!(core
        .submit_order(limit(user, Side::BUY, 10000, "0.001"), after + 2 * SECOND)
        .is_ok());
}

#[test]
fn circuit_breaker_blocks_16_percent_move_but_allows_small_one() {
    let (core, _, _) = new_core();

    // Establish a reference trade at 50000
    let seller = fund(&core, 0, 10);
    let buyer = fund(&core, 1_000_000, 0);
    core.submit_order(limit(seller, Side::SELL, 50000, "1.0"), TS).unwrap();
    let reference = core
        .submit_order(limit(buyer, Side::BUY, 50000, "1.0"), TS + 1_000)
        .unwrap();
    assert_eq!(reference.trades.len(), 1);

    // A crossing pair at 42000 (16% below) does not execute
    let low_seller = fund(&core, 0, 10);
    let low_buyer = fund(&core, 1_000_000, 0);
    let low_ask = core
        .submit_order(limit(low_seller, Side::SELL, 42000, "1.0"), TS + 2_000)
        .unwrap();
    let halted = core
        .submit_order(limit(low_buyer, Side::BUY, 42000, "1.0"), TS + 3_000)
        .unwrap();
    assert!(halted.trades.is_empty());
    assert_eq!(halted.status, OrderStatus::New); // rests unmatched

    // Clear the outlier quotes; while the 42000 ask sits at the top of the
    // book every buy taker is halted at that candidate price
    core.cancel_order(low_seller, low_ask.order_id, TS + 3_500).unwrap();
    core.cancel_order(low_buyer, halted.order_id, TS + 3_600).unwrap();

    // A 0.2% move executes normally
    let near_seller = fund(&core, 0, 10);
    let near_buyer = fund(&core, 1_000_000, 0);
    core.submit_order(limit(near_seller, Side::SELL, 50100, "1.0"), TS + 4_000).unwrap();
    let allowed = core
        .submit_order(limit(near_buyer, Side::BUY, 50100, "1.0"), TS + 5_000)
        .unwrap();
    assert_eq!(allowed.trades.len(), 1);
    assert_eq!(allowed.trades[0].price, Price::from_u64(50100));
}

#[test]
fn events_arrive_in_sequence_order() {
    let (core, sink, _) = new_core();
    let seller = fund(&core, 0, 10);
    let buyer = fund(&core, 1_000_000, 0);

    core.submit_order(limit(seller, Side::SELL, 50000, "0.4"), TS).unwrap();
    core.submit_order(limit(buyer, Side::BUY, 50000, "1.0"), TS + 1).unwrap();

    let events = sink.events();
    assert!(events.len() >= 3);
    assert!(
        events.windows(2).all(|w| w[0].sequence < w[1].sequence),
        "event stream must be strictly sequence-ordered"
    );
}

#[test]
fn prop_place_then_cancel_is_lossless() {
    use proptest::prelude::*;

    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(32));
    runner
        .run(
            &(10_000u64..100_000, 1u64..10_000),
            |(price, amount_ticks)| {
                let (core, _, _) = new_core();
                let user = fund(&core, 200_000, 0);
                let before = core.get_balance(user, "USDT").available;

                let amount = Quantity::new(Decimal::new(amount_ticks as i64, 4));
                let request = OrderRequest::limit(
                    user,
                    Symbol::new("BTC/USDT"),
                    Side::BUY,
                    Price::from_u64(price),
                    amount,
                );
                let placed = core.submit_order(request, TS).unwrap();
                core.cancel_order(user, placed.order_id, TS + 1).unwrap();

                // No residue from any price/amount combination
                prop_assert_eq!(core.get_balance(user, "USDT").available, before);
                prop_assert_eq!(core.get_balance(user, "USDT").frozen, Decimal::ZERO);
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn recovery_reproduces_pre_crash_book_and_matching() {
    let (core, _, ledger) = new_core();

    // Build up book state and one executed trade
    let maker_a = fund(&core, 0, 10);
    let maker_b = fund(&core, 0, 10);
    let buyer = fund(&core, 1_000_000, 0);
    core.submit_order(limit(maker_a, Side::SELL, 50000, "1.0"), TS).unwrap();
    core.submit_order(limit(maker_b, Side::SELL, 50050, "2.0"), TS + 1).unwrap();
    core.submit_order(limit(buyer, Side::BUY, 50000, "0.5"), TS + 2).unwrap();

    let symbol = Symbol::new("BTC/USDT");
    let depth_before = core.get_depth(&symbol, 10).unwrap();
    let store = Arc::clone(core.store());
    drop(core); // the crash

    let (recovered, report) = ExchangeCore::recover(
        registry(),
        ledger,
        store,
        Arc::new(MemoryEventSink::new()),
        RiskGateConfig::default(),
        TS + 10_000,
    );
    assert_eq!(report.orders_restored, 2);

    // Identical depth from durable orders alone
    let depth_after = recovered.get_depth(&symbol, 10).unwrap();
    assert_eq!(depth_before, depth_after);

    // Subsequent matching behaves as the pre-crash book would:
    // the partially filled 50000 maker still has priority
    let buyer2 = fund(&recovered, 1_000_000, 0);
    let result = recovered
        .submit_order(limit(buyer2, Side::BUY, 50050, "1.0"), TS + 20_000)
        .unwrap();

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].price, Price::from_u64(50000));
    assert_eq!(result.trades[0].amount, Quantity::from_str("0.5").unwrap());
    assert_eq!(result.trades[1].price, Price::from_u64(50050));
    assert_eq!(result.trades[1].amount, Quantity::from_str("0.5").unwrap());
    assert_eq!(result.status, OrderStatus::Filled);
}
