//! Error taxonomy for the exchange core
//!
//! Validation and policy rejections are local to the admitting call and
//! never partially apply freezes or book insertions. Circuit-breaker halts
//! are not errors and do not appear here.

use crate::ids::OrderId;
use crate::order::RejectReason;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error surfaced by the core's external interface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("order belongs to another user")]
    Forbidden,

    #[error("order is not cancellable in state {status}")]
    NotCancellable { status: String },

    #[error("system error: {message}")]
    System { message: String },
}

impl CoreError {
    /// Wire-level reject reason for submission failures, where one applies
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            CoreError::Validation(e) => Some(e.reject_reason()),
            CoreError::Policy(e) => Some(e.reject_reason()),
            _ => None,
        }
    }
}

/// Bad input: always rejected before any state mutation; fully recoverable
/// by the caller resubmitting corrected input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("symbol suspended: {symbol}")]
    SymbolSuspended { symbol: String },

    #[error("price exceeds {max} fractional digits")]
    PricePrecision { max: u32 },

    #[error("amount exceeds {max} fractional digits")]
    AmountPrecision { max: u32 },

    #[error("limit order requires a price")]
    MissingPrice,

    #[error("amount must be strictly positive")]
    NonPositiveAmount,

    #[error("amount {amount} below pair minimum {min}")]
    BelowMinAmount { min: String, amount: String },

    #[error("notional {notional} below pair minimum {min}")]
    BelowMinNotional { min: Decimal, notional: Decimal },
}

impl ValidationError {
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ValidationError::UnknownSymbol { .. } => RejectReason::UnknownSymbol,
            ValidationError::SymbolSuspended { .. } => RejectReason::SymbolSuspended,
            ValidationError::PricePrecision { .. } | ValidationError::MissingPrice => {
                RejectReason::InvalidPrice
            }
            ValidationError::AmountPrecision { .. } | ValidationError::NonPositiveAmount => {
                RejectReason::InvalidAmount
            }
            ValidationError::BelowMinAmount { .. } => RejectReason::BelowMinAmount,
            ValidationError::BelowMinNotional { .. } => RejectReason::BelowMinNotional,
        }
    }
}

/// Rejected by a protective policy with no state mutation; the caller may
/// retry later or adjust
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("rate limited: more than {limit} submissions in the rolling window")]
    RateLimited { limit: usize },

    #[error("open order cap reached: {limit}")]
    MaxOpenOrders { limit: u32 },

    #[error("insufficient {currency} balance: required {required}, available {available}")]
    InsufficientBalance {
        currency: String,
        required: Decimal,
        available: Decimal,
    },
}

impl PolicyError {
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            PolicyError::RateLimited { .. } => RejectReason::RateLimited,
            PolicyError::MaxOpenOrders { .. } => RejectReason::MaxOpenOrders,
            PolicyError::InsufficientBalance { .. } => RejectReason::InsufficientBalance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::PricePrecision { max: 2 };
        assert_eq!(err.to_string(), "price exceeds 2 fractional digits");
    }

    #[test]
    fn test_policy_error_reject_reason() {
        let err = PolicyError::RateLimited { limit: 5 };
        assert_eq!(err.reject_reason(), RejectReason::RateLimited);

        let err = PolicyError::MaxOpenOrders { limit: 200 };
        assert_eq!(err.reject_reason(), RejectReason::MaxOpenOrders);
    }

    #[test]
    fn test_core_error_from_validation() {
        let err: CoreError = ValidationError::MissingPrice.into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidPrice));
    }

    #[test]
    fn test_cancel_errors_have_no_reject_reason() {
        let err = CoreError::Forbidden;
        assert_eq!(err.reject_reason(), None);
    }
}
