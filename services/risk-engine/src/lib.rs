//! Risk Engine Service
//!
//! Admission gate for incoming orders. Provides:
//! - order validation (symbol status, precision, minimum size/notional)
//! - per-user sliding-window rate limiting
//! - per-user open-order caps
//! - atomic balance freezing before an order reaches the matching engine
//!
//! Rejections never mutate state; a successfully admitted order has its
//! collateral frozen and its global sequence assigned.

pub mod gate;
pub mod rate_limit;
pub mod validator;

pub use gate::{RiskGate, RiskGateConfig};
pub use rate_limit::SlidingWindowLimiter;
