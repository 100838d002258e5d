//! Admission gate
//!
//! Orchestrates validation, rate limiting, the open-order cap, and the
//! balance freeze for incoming orders. Admission is serialized per user so
//! the rate-limit window, the open-order count, and the freeze are
//! consistent under concurrent submissions from the same user.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use ledger::Ledger;
use rust_decimal::Decimal;
use tracing::{debug, info};
use types::errors::{CoreError, PolicyError};
use types::ids::UserId;
use types::numeric::{notional, Price};
use types::order::{Order, OrderRequest, OrderType, Side};
use types::pair::TradingPair;
use types::sequence::Sequencer;

use crate::rate_limit::SlidingWindowLimiter;
use crate::validator;

/// Risk gate configuration
#[derive(Debug, Clone)]
pub struct RiskGateConfig {
    /// Accepted submissions allowed per user per rolling window
    pub max_submissions_per_window: usize,
    /// Rolling rate-limit window in Unix nanoseconds
    pub submission_window_nanos: i64,
    /// Maximum simultaneously open orders per user
    pub max_open_orders: u32,
}

impl Default for RiskGateConfig {
    fn default() -> Self {
        Self {
            max_submissions_per_window: 5,
            submission_window_nanos: 1_000_000_000,
            max_open_orders: 200,
        }
    }
}

/// Admission gate for incoming orders
#[derive(Debug)]
pub struct RiskGate {
    config: RiskGateConfig,
    limiter: SlidingWindowLimiter,
    open_orders: DashMap<UserId, u32>,
    admission_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl RiskGate {
    pub fn new(config: RiskGateConfig) -> Self {
        let limiter = SlidingWindowLimiter::new(
            config.max_submissions_per_window,
            config.submission_window_nanos,
        );
        Self {
            config,
            limiter,
            open_orders: DashMap::new(),
            admission_locks: DashMap::new(),
        }
    }

    /// Validate and admit an order request
    ///
    /// On success the required balance is frozen, the submission is counted
    /// against the user's rate window, the open-order count is incremented,
    /// and the returned order carries its global sequence. On failure
    /// nothing is mutated.
    ///
    /// `best_price` is the best opposite-side book price, used for the
    /// market-order notional estimate.
    pub fn admit(
        &self,
        request: &OrderRequest,
        pair: &TradingPair,
        best_price: Option<Price>,
        ledger: &Ledger,
        sequencer: &Sequencer,
        now: i64,
    ) -> Result<Order, CoreError> {
        let lock = self.user_lock(request.user_id);
        let _guard = lock.lock().expect("admission lock poisoned");

        validator::validate(pair, request, best_price)?;

        if !self.limiter.check(request.user_id, now) {
            debug!(user_id = %request.user_id, "submission rate limited");
            return Err(PolicyError::RateLimited {
                limit: self.config.max_submissions_per_window,
            }
            .into());
        }

        let open = self.open_count(request.user_id);
        if open >= self.config.max_open_orders {
            debug!(user_id = %request.user_id, open, "open order cap reached");
            return Err(PolicyError::MaxOpenOrders {
                limit: self.config.max_open_orders,
            }
            .into());
        }

        let (currency, reserve) = self.required_reserve(request, pair, ledger)?;
        if !ledger.freeze(request.user_id, &currency, reserve, now) {
            let balance = ledger.balance(request.user_id, &currency);
            return Err(PolicyError::InsufficientBalance {
                currency,
                required: reserve,
                available: balance.available,
            }
            .into());
        }

        self.limiter.record(request.user_id, now);
        *self.open_orders.entry(request.user_id).or_insert(0) += 1;

        let order = Order::new(request, sequencer.next(), reserve, now);
        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            symbol = %order.symbol,
            side = ?order.side,
            sequence = order.sequence,
            "order admitted"
        );
        Ok(order)
    }

    /// Release one open-order slot after an order reaches a terminal state
    pub fn release_open(&self, user_id: UserId) {
        if let Some(mut count) = self.open_orders.get_mut(&user_id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Current open-order count for a user
    pub fn open_count(&self, user_id: UserId) -> u32 {
        self.open_orders.get(&user_id).map(|c| *c).unwrap_or(0)
    }

    /// Restore an open-order count during recovery
    pub fn set_open_count(&self, user_id: UserId, count: u32) {
        self.open_orders.insert(user_id, count);
    }

    // ── Internal ────────────────────────────────────────────────────

    /// The currency and amount to freeze for a request
    ///
    /// Buy limit orders reserve quote at the limit price; sell orders
    /// reserve the base amount; market buys reserve the entire available
    /// quote balance, which must be non-zero.
    fn required_reserve(
        &self,
        request: &OrderRequest,
        pair: &TradingPair,
        ledger: &Ledger,
    ) -> Result<(String, Decimal), CoreError> {
        match (request.side, request.order_type) {
            (Side::SELL, _) => Ok((pair.base.clone(), request.amount.as_decimal())),
            (Side::BUY, OrderType::Limit) => {
                let price = request.price.expect("validated limit order has a price");
                Ok((pair.quote.clone(), notional(price, request.amount)))
            }
            (Side::BUY, OrderType::Market) => {
                let available = ledger.balance(request.user_id, &pair.quote).available;
                if available <= Decimal::ZERO {
                    return Err(PolicyError::InsufficientBalance {
                        currency: pair.quote.clone(),
                        required: Decimal::ZERO,
                        available,
                    }
                    .into());
                }
                Ok((pair.quote.clone(), available))
            }
        }
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.admission_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for RiskGate {
    fn default() -> Self {
        Self::new(RiskGateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::errors::ValidationError;
    use types::ids::Symbol;
    use types::numeric::Quantity;
    use types::order::OrderStatus;

    const TS: i64 = 1708123456789000000;
    const SECOND: i64 = 1_000_000_000;

    fn btc_usdt() -> TradingPair {
        TradingPair::new(
            Symbol::new("BTC/USDT"),
            2,
            4,
            Quantity::from_str("0.001").unwrap(),
            Decimal::from(10),
        )
    }

    fn funded_user(ledger: &Ledger) -> UserId {
        let user = UserId::new();
        ledger.deposit(user, "USDT", Decimal::from(1_000_000), TS).unwrap();
        ledger.deposit(user, "BTC", Decimal::from(100), TS).unwrap();
        user
    }

    fn buy_limit(user: UserId, price: u64, amount: &str) -> OrderRequest {
        OrderRequest::limit(
            user,
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Price::from_u64(price),
            Quantity::from_str(amount).unwrap(),
        )
    }

    #[test]
    fn test_admit_freezes_quote_for_buy_limit() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = funded_user(&ledger);

        let order = gate
            .admit(&buy_limit(user, 50000, "1.0"), &pair, None, &ledger, &sequencer, TS)
            .unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.reserved, Decimal::from(50000));
        assert_eq!(ledger.balance(user, "USDT").frozen, Decimal::from(50000));
        assert_eq!(gate.open_count(user), 1);
    }

    #[test]
    fn test_admit_freezes_base_for_sell() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = funded_user(&ledger);

        let request = OrderRequest::limit(
            user,
            Symbol::new("BTC/USDT"),
            Side::SELL,
            Price::from_u64(50000),
            Quantity::from_str("2.0").unwrap(),
        );
        let order = gate.admit(&request, &pair, None, &ledger, &sequencer, TS).unwrap();

        assert_eq!(order.reserved, Decimal::from(2));
        assert_eq!(ledger.balance(user, "BTC").frozen, Decimal::from(2));
    }

    #[test]
    fn test_admit_market_buy_freezes_available_quote() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = UserId::new();
        ledger.deposit(user, "USDT", Decimal::from(7500), TS).unwrap();

        let request = OrderRequest::market(
            user,
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Quantity::from_str("1.0").unwrap(),
        );
        let order = gate
            .admit(&request, &pair, Some(Price::from_u64(50000)), &ledger, &sequencer, TS)
            .unwrap();

        assert_eq!(order.reserved, Decimal::from(7500));
        let balance = ledger.balance(user, "USDT");
        assert_eq!(balance.available, Decimal::ZERO);
        assert_eq!(balance.frozen, Decimal::from(7500));
    }

    #[test]
    fn test_admit_insufficient_balance() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = UserId::new();
        ledger.deposit(user, "USDT", Decimal::from(100), TS).unwrap();

        let err = gate
            .admit(&buy_limit(user, 50000, "1.0"), &pair, None, &ledger, &sequencer, TS)
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Policy(PolicyError::InsufficientBalance { .. })
        ));
        // Rejection froze nothing
        assert_eq!(ledger.balance(user, "USDT").frozen, Decimal::ZERO);
        assert_eq!(gate.open_count(user), 0);
    }

    #[test]
    fn test_admit_rate_limited_sixth_submission() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = funded_user(&ledger);

        for i in 0..5 {
            gate.admit(
                &buy_limit(user, 50000, "0.01"),
                &pair,
                None,
                &ledger,
                &sequencer,
                TS + i * 1_000_000,
            )
            .unwrap();
        }

        let err = gate
            .admit(&buy_limit(user, 50000, "0.01"), &pair, None, &ledger, &sequencer, TS + 5_000_000)
            .unwrap_err();
        assert!(matches!(err, CoreError::Policy(PolicyError::RateLimited { .. })));

        // After the window elapses, submission succeeds
        assert!(gate
            .admit(
                &buy_limit(user, 50000, "0.01"),
                &pair,
                None,
                &ledger,
                &sequencer,
                TS + SECOND + 5_000_000,
            )
            .is_ok());
    }

    #[test]
    fn test_admit_max_open_orders() {
        let config = RiskGateConfig {
            max_submissions_per_window: 1000,
            max_open_orders: 3,
            ..RiskGateConfig::default()
        };
        let gate = RiskGate::new(config);
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = funded_user(&ledger);

        for i in 0..3 {
            gate.admit(&buy_limit(user, 50000, "0.01"), &pair, None, &ledger, &sequencer, TS + i)
                .unwrap();
        }

        let err = gate
            .admit(&buy_limit(user, 50000, "0.01"), &pair, None, &ledger, &sequencer, TS + 10)
            .unwrap_err();
        assert!(matches!(err, CoreError::Policy(PolicyError::MaxOpenOrders { .. })));

        // Cancelling an order frees a slot
        gate.release_open(user);
        assert!(gate
            .admit(&buy_limit(user, 50000, "0.01"), &pair, None, &ledger, &sequencer, TS + 20)
            .is_ok());
    }

    #[test]
    fn test_admit_validation_precedes_policy() {
        let gate = RiskGate::default();
        let ledger = Ledger::new();
        let sequencer = Sequencer::new();
        let pair = btc_usdt();
        let user = funded_user(&ledger);

        let request = buy_limit(user, 50000, "0.0001"); // below min amount
        let err = gate.admit(&request, &pair, None, &ledger, &sequencer, TS).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::BelowMinAmount { .. })
        ));
    }
}
