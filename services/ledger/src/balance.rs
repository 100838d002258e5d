//! Balance for a single (user, currency) slot
//!
//! Invariant: `available ≥ 0` and `frozen ≥ 0` at all times.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Funds held for one user in one currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Spendable funds
    pub available: Decimal,
    /// Funds reserved against open orders
    pub frozen: Decimal,
}

impl Balance {
    /// An empty balance slot
    pub fn zero() -> Self {
        Self {
            available: Decimal::ZERO,
            frozen: Decimal::ZERO,
        }
    }

    /// Total funds in this slot
    pub fn total(&self) -> Decimal {
        self.available + self.frozen
    }

    /// Check balance invariant: both components non-negative
    pub fn check_invariant(&self) -> bool {
        self.available >= Decimal::ZERO && self.frozen >= Decimal::ZERO
    }

    /// Credit to available balance (deposit, trade settlement)
    ///
    /// # Panics
    /// Panics on negative amount
    pub fn credit(&mut self, amount: Decimal) {
        assert!(amount >= Decimal::ZERO, "Credit amount must be non-negative");
        self.available += amount;
        debug_assert!(self.check_invariant());
    }

    /// Conditionally debit available balance
    ///
    /// Succeeds iff `available ≥ amount`; otherwise leaves the balance
    /// untouched and returns false.
    pub fn try_debit(&mut self, amount: Decimal) -> bool {
        assert!(amount >= Decimal::ZERO, "Debit amount must be non-negative");
        if self.available < amount {
            return false;
        }
        self.available -= amount;
        debug_assert!(self.check_invariant());
        true
    }

    /// Conditionally move funds from available to frozen
    ///
    /// Succeeds iff `available ≥ amount`; otherwise a no-op returning false.
    pub fn try_freeze(&mut self, amount: Decimal) -> bool {
        assert!(amount >= Decimal::ZERO, "Freeze amount must be non-negative");
        if self.available < amount {
            return false;
        }
        self.available -= amount;
        self.frozen += amount;
        debug_assert!(self.check_invariant());
        true
    }

    /// Move funds from frozen back to available, clamped at the frozen total
    ///
    /// Returns the amount actually moved.
    pub fn unfreeze(&mut self, amount: Decimal) -> Decimal {
        assert!(amount >= Decimal::ZERO, "Unfreeze amount must be non-negative");
        let moved = amount.min(self.frozen);
        self.frozen -= moved;
        self.available += moved;
        debug_assert!(self.check_invariant());
        moved
    }

    /// Conditionally consume frozen funds (trade settlement)
    ///
    /// Succeeds iff `frozen ≥ amount`; otherwise a no-op returning false.
    pub fn try_spend_frozen(&mut self, amount: Decimal) -> bool {
        assert!(amount >= Decimal::ZERO, "Spend amount must be non-negative");
        if self.frozen < amount {
            return false;
        }
        self.frozen -= amount;
        debug_assert!(self.check_invariant());
        true
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_balance_credit() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(10000));
        assert_eq!(balance.available, Decimal::from(10000));
        assert_eq!(balance.frozen, Decimal::ZERO);
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_freeze() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(10000));

        assert!(balance.try_freeze(Decimal::from(3000)));
        assert_eq!(balance.available, Decimal::from(7000));
        assert_eq!(balance.frozen, Decimal::from(3000));
        assert_eq!(balance.total(), Decimal::from(10000));
    }

    #[test]
    fn test_balance_overfreeze_is_noop() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(100));

        assert!(!balance.try_freeze(Decimal::from(150)));
        assert_eq!(balance.available, Decimal::from(100));
        assert_eq!(balance.frozen, Decimal::ZERO);
    }

    #[test]
    fn test_balance_unfreeze_clamped() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(100));
        balance.try_freeze(Decimal::from(60));

        // Requesting more than frozen moves only what is frozen
        let moved = balance.unfreeze(Decimal::from(80));
        assert_eq!(moved, Decimal::from(60));
        assert_eq!(balance.available, Decimal::from(100));
        assert_eq!(balance.frozen, Decimal::ZERO);
    }

    #[test]
    fn test_balance_spend_frozen() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(100));
        balance.try_freeze(Decimal::from(60));

        assert!(balance.try_spend_frozen(Decimal::from(60)));
        assert_eq!(balance.frozen, Decimal::ZERO);
        assert_eq!(balance.available, Decimal::from(40));
        assert!(!balance.try_spend_frozen(Decimal::from(1)));
    }

    #[test]
    fn test_balance_conditional_debit() {
        let mut balance = Balance::zero();
        balance.credit(Decimal::from(50));

        assert!(balance.try_debit(Decimal::from(50)));
        assert!(!balance.try_debit(Decimal::from(1)));
        assert_eq!(balance.available, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_freeze_unfreeze_round_trip(
            deposit in 1u64..1_000_000,
            freeze in 1u64..1_000_000,
        ) {
            // Freezing then unfreezing restores available exactly, no residue
            let mut balance = Balance::zero();
            let deposit = Decimal::new(deposit as i64, 4);
            let freeze = Decimal::new(freeze as i64, 4);
            balance.credit(deposit);

            if balance.try_freeze(freeze) {
                balance.unfreeze(freeze);
            }
            prop_assert_eq!(balance.available, deposit);
            prop_assert_eq!(balance.frozen, Decimal::ZERO);
        }
    }
}
