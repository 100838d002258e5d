//! Concurrent balance ledger
//!
//! Balances are keyed by (user, currency) and mutated under the map's
//! per-entry guard, so every conditional check-and-mutate is atomic with
//! respect to concurrent operations on the same slot. A trade settlement
//! applies up to five legs (two spends, two credits, one refund), each
//! logged; legs already present in the transaction log are skipped, which
//! makes settlement re-runnable during recovery.

use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;
use types::ids::{TradeId, UserId};
use types::order::Side;
use types::pair::TradingPair;
use types::trade::Trade;

use crate::balance::Balance;
use crate::transactions::{LedgerTx, SettlementLeg, TransactionLog, TxKind};

/// Ledger operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("amount must be positive: {0}")]
    NonPositiveAmount(Decimal),

    #[error("insufficient available {currency}: required {required}, available {available}")]
    InsufficientAvailable {
        currency: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient frozen {currency}: required {required}, frozen {frozen}")]
    InsufficientFrozen {
        currency: String,
        required: Decimal,
        frozen: Decimal,
    },
}

/// Balance slot key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BalanceKey {
    user_id: UserId,
    currency: String,
}

impl BalanceKey {
    fn new(user_id: UserId, currency: &str) -> Self {
        Self {
            user_id,
            currency: currency.to_string(),
        }
    }
}

/// Per-user, per-currency balance store
///
/// Slots are created lazily on first credit and never deleted.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: DashMap<BalanceKey, Balance>,
    log: TransactionLog,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            log: TransactionLog::new(),
        }
    }

    /// Current balance for a slot; zero if never credited
    pub fn balance(&self, user_id: UserId, currency: &str) -> Balance {
        self.balances
            .get(&BalanceKey::new(user_id, currency))
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// The wallet transaction log
    pub fn transactions(&self) -> &TransactionLog {
        &self.log
    }

    /// Deposit funds into a user's available balance
    pub fn deposit(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        timestamp: i64,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        self.balances
            .entry(BalanceKey::new(user_id, currency))
            .or_default()
            .credit(amount);
        self.log_tx(user_id, currency, TxKind::Deposit, amount, None, None, timestamp);
        Ok(())
    }

    /// Withdraw from a user's available balance
    ///
    /// Conditional atomic decrement: fails without mutation unless
    /// `available ≥ amount`, so concurrent withdrawals can never drive the
    /// balance negative.
    pub fn withdraw(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        timestamp: i64,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        {
            let mut entry = self
                .balances
                .entry(BalanceKey::new(user_id, currency))
                .or_default();
            if !entry.try_debit(amount) {
                return Err(LedgerError::InsufficientAvailable {
                    currency: currency.to_string(),
                    required: amount,
                    available: entry.available,
                });
            }
        }
        self.log_tx(user_id, currency, TxKind::Withdrawal, amount, None, None, timestamp);
        Ok(())
    }

    /// Atomically move `amount` from available to frozen
    ///
    /// Returns false (and mutates nothing) if available funds are short.
    pub fn freeze(&self, user_id: UserId, currency: &str, amount: Decimal, timestamp: i64) -> bool {
        if amount <= Decimal::ZERO {
            return false;
        }
        let frozen = self
            .balances
            .entry(BalanceKey::new(user_id, currency))
            .or_default()
            .try_freeze(amount);
        if frozen {
            self.log_tx(user_id, currency, TxKind::Freeze, amount, None, None, timestamp);
        }
        frozen
    }

    /// Move up to `amount` from frozen back to available, clamped at zero
    ///
    /// Returns the amount actually moved. Used on cancel and for
    /// price-improvement refunds during settlement.
    pub fn unfreeze(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        timestamp: i64,
    ) -> Decimal {
        self.unfreeze_logged(user_id, currency, amount, None, None, timestamp)
    }

    /// Credit a user's available balance
    ///
    /// Settlement credits go through `settle_trade` and carry trade
    /// references; this entry point is for corrections and tests.
    pub fn credit(&self, user_id: UserId, currency: &str, amount: Decimal, timestamp: i64) {
        assert!(amount >= Decimal::ZERO, "Credit amount must be non-negative");
        self.balances
            .entry(BalanceKey::new(user_id, currency))
            .or_default()
            .credit(amount);
        self.log_tx(user_id, currency, TxKind::TradeCredit, amount, None, None, timestamp);
    }

    /// Apply the balance legs of one trade as a settlement unit
    ///
    /// Each leg is logged with the trade id; legs already present in the log
    /// are skipped, so calling this again for a half-applied trade (the
    /// recovery path) completes exactly the missing mutations.
    ///
    /// `taker_refund` is the price-improvement amount to unfreeze back to a
    /// buying taker whose limit reserve exceeded the execution notional.
    pub fn settle_trade(
        &self,
        trade: &Trade,
        pair: &TradingPair,
        taker_refund: Decimal,
        timestamp: i64,
    ) -> Result<(), LedgerError> {
        let qty = trade.amount.as_decimal();
        let notional = trade.trade_value();

        // (leg, user, currency, amount) with spends first so a replayed
        // half-settlement can never credit funds it has not collected.
        let (maker_spend, maker_credit, taker_spend, taker_credit) = match trade.taker_side {
            Side::BUY => (
                (trade.maker_user_id, pair.base.as_str(), qty),
                (trade.maker_user_id, pair.quote.as_str(), notional - trade.maker_fee),
                (trade.taker_user_id, pair.quote.as_str(), notional),
                (trade.taker_user_id, pair.base.as_str(), qty - trade.taker_fee),
            ),
            Side::SELL => (
                (trade.maker_user_id, pair.quote.as_str(), notional),
                (trade.maker_user_id, pair.base.as_str(), qty - trade.maker_fee),
                (trade.taker_user_id, pair.base.as_str(), qty),
                (trade.taker_user_id, pair.quote.as_str(), notional - trade.taker_fee),
            ),
        };

        self.spend_frozen_leg(maker_spend, trade.trade_id, SettlementLeg::MakerSpend, timestamp)?;
        self.spend_frozen_leg(taker_spend, trade.trade_id, SettlementLeg::TakerSpend, timestamp)?;
        self.credit_leg(maker_credit, trade.trade_id, SettlementLeg::MakerCredit, timestamp);
        self.credit_leg(taker_credit, trade.trade_id, SettlementLeg::TakerCredit, timestamp);

        if taker_refund > Decimal::ZERO {
            if !self.log.has_leg(trade.trade_id, SettlementLeg::TakerRefund) {
                self.unfreeze_logged(
                    trade.taker_user_id,
                    &pair.quote,
                    taker_refund,
                    Some(trade.trade_id),
                    Some(SettlementLeg::TakerRefund),
                    timestamp,
                );
            }
        }

        debug!(
            trade_id = %trade.trade_id,
            symbol = %trade.symbol,
            amount = %trade.amount,
            price = %trade.price,
            "trade settled"
        );
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────

    fn spend_frozen_leg(
        &self,
        (user_id, currency, amount): (UserId, &str, Decimal),
        trade_id: TradeId,
        leg: SettlementLeg,
        timestamp: i64,
    ) -> Result<(), LedgerError> {
        if self.log.has_leg(trade_id, leg) {
            return Ok(());
        }
        {
            let mut entry = self
                .balances
                .entry(BalanceKey::new(user_id, currency))
                .or_default();
            if !entry.try_spend_frozen(amount) {
                return Err(LedgerError::InsufficientFrozen {
                    currency: currency.to_string(),
                    required: amount,
                    frozen: entry.frozen,
                });
            }
        }
        self.log_tx(user_id, currency, TxKind::TradeSpend, amount, Some(trade_id), Some(leg), timestamp);
        Ok(())
    }

    fn credit_leg(
        &self,
        (user_id, currency, amount): (UserId, &str, Decimal),
        trade_id: TradeId,
        leg: SettlementLeg,
        timestamp: i64,
    ) {
        if self.log.has_leg(trade_id, leg) {
            return;
        }
        self.balances
            .entry(BalanceKey::new(user_id, currency))
            .or_default()
            .credit(amount);
        self.log_tx(user_id, currency, TxKind::TradeCredit, amount, Some(trade_id), Some(leg), timestamp);
    }

    fn unfreeze_logged(
        &self,
        user_id: UserId,
        currency: &str,
        amount: Decimal,
        trade_id: Option<TradeId>,
        leg: Option<SettlementLeg>,
        timestamp: i64,
    ) -> Decimal {
        let moved = self
            .balances
            .entry(BalanceKey::new(user_id, currency))
            .or_default()
            .unfreeze(amount);
        if moved > Decimal::ZERO {
            self.log_tx(user_id, currency, TxKind::Unfreeze, moved, trade_id, leg, timestamp);
        }
        moved
    }

    #[allow(clippy::too_many_arguments)]
    fn log_tx(
        &self,
        user_id: UserId,
        currency: &str,
        kind: TxKind,
        amount: Decimal,
        trade_id: Option<TradeId>,
        leg: Option<SettlementLeg>,
        timestamp: i64,
    ) {
        self.log.append(LedgerTx {
            user_id,
            currency: currency.to_string(),
            kind,
            amount,
            trade_id,
            leg,
            timestamp,
        });
    }
}
