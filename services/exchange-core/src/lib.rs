//! Exchange Core Service
//!
//! The synchronous facade the external web/API layer calls into:
//! order submission through admission, matching, and settlement; cancels;
//! depth and balance queries; the outbound trade event stream; stop/OCO
//! watch conditions; and crash recovery from the durable order and trade
//! records.
//!
//! Matching for a symbol is single-writer: one order at a time moves
//! through the admit→match→settle pipeline of a symbol, while different
//! symbols process independently.

pub mod events;
pub mod exchange;
pub mod recovery;
pub mod store;
pub mod watch;

pub use events::{EventSink, MemoryEventSink};
pub use exchange::{now_nanos, CancelResult, Depth, ExchangeCore, IntentResult, OrderResult};
pub use recovery::RecoveryReport;
pub use store::OrderStore;
pub use watch::WatchList;
