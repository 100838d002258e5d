//! Price circuit breaker
//!
//! Tracks the most recent executed trade price per symbol and halts any
//! candidate match that would move the price beyond the pair's configured
//! deviation bound within the lookback window. The reference only advances
//! on allowed, executed trades; halted candidates leave it untouched.

use rust_decimal::Decimal;
use tracing::warn;
use types::numeric::Price;
use types::pair::TradingPair;

/// Breaker decision for one candidate trade price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerVerdict {
    /// Candidate price is within bounds (or no fresh reference exists)
    Allow,
    /// Candidate price deviates too far from the reference; do not execute
    Halt,
}

/// Per-symbol circuit breaker state
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    /// Last allowed executed trade: (price, Unix nanos)
    reference: Option<(Price, i64)>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self { reference: None }
    }

    /// Check a candidate trade price against the reference
    ///
    /// A missing or stale reference (older than the pair's lookback window)
    /// allows any price; price discovery restarts from the next trade.
    pub fn check(&self, candidate: Price, pair: &TradingPair, now: i64) -> BreakerVerdict {
        let Some((reference, at)) = self.reference else {
            return BreakerVerdict::Allow;
        };
        if now - at > pair.lookback_nanos {
            return BreakerVerdict::Allow;
        }

        let deviation_pct = (candidate.as_decimal() - reference.as_decimal()).abs()
            / reference.as_decimal()
            * Decimal::from(100);
        if deviation_pct > pair.max_deviation_pct {
            warn!(
                symbol = %pair.symbol,
                %candidate,
                %reference,
                %deviation_pct,
                "circuit breaker halt"
            );
            BreakerVerdict::Halt
        } else {
            BreakerVerdict::Allow
        }
    }

    /// Advance the reference after an allowed, executed trade
    pub fn on_trade(&mut self, price: Price, now: i64) {
        self.reference = Some((price, now));
    }

    /// Seed the reference during recovery from the last persisted trade
    pub fn seed(&mut self, price: Price, at: i64) {
        self.reference = Some((price, at));
    }

    /// Current reference price, if any
    pub fn reference(&self) -> Option<Price> {
        self.reference.map(|(price, _)| price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::ids::Symbol;
    use types::numeric::Quantity;

    const TS: i64 = 1708123456789000000;

    fn pair() -> TradingPair {
        TradingPair::new(
            Symbol::new("BTC/USDT"),
            2,
            4,
            Quantity::from_str("0.0001").unwrap(),
            Decimal::from(10),
        )
    }

    #[test]
    fn test_no_reference_allows_anything() {
        let breaker = CircuitBreaker::new();
        assert_eq!(
            breaker.check(Price::from_u64(1), &pair(), TS),
            BreakerVerdict::Allow
        );
    }

    #[test]
    fn test_halts_beyond_deviation() {
        let mut breaker = CircuitBreaker::new();
        breaker.on_trade(Price::from_u64(50000), TS);

        // 42000 is a 16% drop: halted
        assert_eq!(
            breaker.check(Price::from_u64(42000), &pair(), TS + 1),
            BreakerVerdict::Halt
        );
        // 50100 is a 0.2% move: allowed
        assert_eq!(
            breaker.check(Price::from_u64(50100), &pair(), TS + 1),
            BreakerVerdict::Allow
        );
    }

    #[test]
    fn test_reference_not_updated_on_halt() {
        let mut breaker = CircuitBreaker::new();
        breaker.on_trade(Price::from_u64(50000), TS);

        assert_eq!(
            breaker.check(Price::from_u64(42000), &pair(), TS + 1),
            BreakerVerdict::Halt
        );
        assert_eq!(breaker.reference(), Some(Price::from_u64(50000)));
    }

    #[test]
    fn test_stale_reference_allows() {
        let mut breaker = CircuitBreaker::new();
        breaker.on_trade(Price::from_u64(50000), TS);

        let after_window = TS + pair().lookback_nanos + 1;
        assert_eq!(
            breaker.check(Price::from_u64(42000), &pair(), after_window),
            BreakerVerdict::Allow
        );
    }

    #[test]
    fn test_boundary_deviation_allowed() {
        let mut breaker = CircuitBreaker::new();
        breaker.on_trade(Price::from_u64(50000), TS);

        // Exactly 15% (42500) is within the bound; only beyond it halts
        assert_eq!(
            breaker.check(Price::from_u64(42500), &pair(), TS + 1),
            BreakerVerdict::Allow
        );
        assert_eq!(
            breaker.check(Price::from_u64(42499), &pair(), TS + 1),
            BreakerVerdict::Halt
        );
    }
}
