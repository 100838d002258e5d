//! Matching Engine Service
//!
//! Price-time priority matching over per-symbol in-memory order books.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced (better price first, then
//!   ascending admission sequence)
//! - Execution price is always the resting (maker) order's price
//! - No self-trades: a user's own resting orders are skipped, not matched
//! - Per-trade ledger settlement completes before the trade is reported
//! - The circuit breaker is consulted before every candidate match

pub mod book;
pub mod breaker;
pub mod engine;
pub mod events;
pub mod matching;

pub use book::SymbolBook;
pub use breaker::{BreakerVerdict, CircuitBreaker};
pub use engine::{process, EngineError, MatchOutcome};
pub use events::{MarketEvent, MarketEventPayload};
pub use matching::executor::MatchExecutor;
