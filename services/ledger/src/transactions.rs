//! Wallet transaction log
//!
//! Append-only record of every balance mutation. Settlement entries carry
//! the trade id and leg so a recovery pass can tell which legs of a trade
//! reached the ledger and re-apply only the missing ones.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use types::ids::{TradeId, UserId};

/// What kind of mutation an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    Deposit,
    Withdrawal,
    Freeze,
    Unfreeze,
    /// Frozen funds consumed by a trade settlement leg
    TradeSpend,
    /// Funds received from a trade settlement leg, net of fee
    TradeCredit,
}

/// Which leg of a trade settlement an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementLeg {
    MakerSpend,
    MakerCredit,
    TakerSpend,
    TakerCredit,
    /// Price-improvement refund unfrozen back to the taker
    TakerRefund,
}

/// One balance mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTx {
    pub user_id: UserId,
    pub currency: String,
    pub kind: TxKind,
    pub amount: Decimal,
    /// Set for settlement entries
    pub trade_id: Option<TradeId>,
    /// Set for settlement entries
    pub leg: Option<SettlementLeg>,
    pub timestamp: i64, // Unix nanos
}

/// Append-only transaction log
///
/// The log is the write-behind audit record of the ledger; storage
/// technology behind it is out of scope here.
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: RwLock<Vec<LedgerTx>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append one entry
    pub fn append(&self, tx: LedgerTx) {
        self.entries.write().expect("transaction log poisoned").push(tx);
    }

    /// Check whether a settlement leg of a trade already reached the ledger
    pub fn has_leg(&self, trade_id: TradeId, leg: SettlementLeg) -> bool {
        self.entries
            .read()
            .expect("transaction log poisoned")
            .iter()
            .any(|tx| tx.trade_id == Some(trade_id) && tx.leg == Some(leg))
    }

    /// Copy of the full log, in append order
    pub fn snapshot(&self) -> Vec<LedgerTx> {
        self.entries.read().expect("transaction log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("transaction log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit_tx(user_id: UserId) -> LedgerTx {
        LedgerTx {
            user_id,
            currency: "USDT".to_string(),
            kind: TxKind::Deposit,
            amount: Decimal::from(100),
            trade_id: None,
            leg: None,
            timestamp: 1708123456789000000,
        }
    }

    #[test]
    fn test_append_and_snapshot() {
        let log = TransactionLog::new();
        let user = UserId::new();

        log.append(deposit_tx(user));
        log.append(deposit_tx(user));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, TxKind::Deposit);
    }

    #[test]
    fn test_has_leg() {
        let log = TransactionLog::new();
        let trade_id = TradeId::new();

        assert!(!log.has_leg(trade_id, SettlementLeg::MakerSpend));

        log.append(LedgerTx {
            user_id: UserId::new(),
            currency: "BTC".to_string(),
            kind: TxKind::TradeSpend,
            amount: Decimal::from(1),
            trade_id: Some(trade_id),
            leg: Some(SettlementLeg::MakerSpend),
            timestamp: 1708123456789000000,
        });

        assert!(log.has_leg(trade_id, SettlementLeg::MakerSpend));
        assert!(!log.has_leg(trade_id, SettlementLeg::TakerSpend));
    }
}
