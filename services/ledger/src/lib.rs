//! Ledger Service
//!
//! Per-user, per-currency balance store with `available`/`frozen` fields.
//! Exposes freeze/unfreeze/credit/debit primitives with per-key atomicity
//! and applies trade settlements as idempotent, logged legs so a half-applied
//! settlement can be completed from the durable trade record.
//!
//! **Key Invariants:**
//! - `available ≥ 0` and `frozen ≥ 0` at every observable instant
//! - `available + frozen` changes only via deposit, withdrawal, freeze,
//!   unfreeze, or trade settlement
//! - Every balance mutation produces one transaction log entry

pub mod balance;
pub mod ledger;
pub mod transactions;

pub use balance::Balance;
pub use ledger::{Ledger, LedgerError};
pub use transactions::{LedgerTx, SettlementLeg, TransactionLog, TxKind};
