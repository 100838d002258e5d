//! Matching logic module
//!
//! Crossing predicates and the trade executor.

pub mod crossing;
pub mod executor;

pub use crossing::{can_match, taker_accepts};
pub use executor::MatchExecutor;
