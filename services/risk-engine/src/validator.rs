//! Pre-admission order validation
//!
//! Validates an order request against its trading pair's declared limits.
//! Returns the first failing check; checks run in a fixed order so
//! rejections are deterministic for identical input.

use types::errors::ValidationError;
use types::numeric::{notional, Price};
use types::order::{OrderRequest, OrderType};
use types::pair::TradingPair;

/// Validate an order request against its pair configuration.
///
/// `best_price` is the best opposite-side book price, used to estimate the
/// notional of market orders; a market order against an empty book skips the
/// notional check (it will cancel for lack of liquidity downstream).
///
/// Checks performed (in order):
/// 1. Pair is active
/// 2. Price and amount conform to declared decimal precision
/// 3. Amount is at least the pair minimum
/// 4. Notional (price × amount) is at least the pair minimum
/// 5. Amount is strictly positive
pub fn validate(
    pair: &TradingPair,
    request: &OrderRequest,
    best_price: Option<Price>,
) -> Result<(), ValidationError> {
    // 1. Pair must accept orders
    if !pair.is_active() {
        return Err(ValidationError::SymbolSuspended {
            symbol: pair.symbol.as_str().to_string(),
        });
    }

    // 2. Declared precision; limit orders must carry a price
    match request.order_type {
        OrderType::Limit => {
            let price = request.price.ok_or(ValidationError::MissingPrice)?;
            if !pair.price_conforms(price) {
                return Err(ValidationError::PricePrecision {
                    max: pair.price_precision,
                });
            }
        }
        OrderType::Market => {}
    }
    if !pair.amount_conforms(request.amount) {
        return Err(ValidationError::AmountPrecision {
            max: pair.amount_precision,
        });
    }

    // 3. Minimum amount
    if request.amount < pair.min_amount {
        return Err(ValidationError::BelowMinAmount {
            min: pair.min_amount.to_string(),
            amount: request.amount.to_string(),
        });
    }

    // 4. Minimum notional, estimated at the best available price for
    //    market orders
    let reference_price = match request.order_type {
        OrderType::Limit => request.price,
        OrderType::Market => best_price,
    };
    if let Some(price) = reference_price {
        let value = notional(price, request.amount);
        if value < pair.min_notional {
            return Err(ValidationError::BelowMinNotional {
                min: pair.min_notional,
                notional: value,
            });
        }
    }

    // 5. Strict positivity (price positivity is enforced by the Price type)
    if request.amount.is_zero() {
        return Err(ValidationError::NonPositiveAmount);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::ids::{Symbol, UserId};
    use types::numeric::Quantity;
    use types::order::Side;
    use types::pair::PairStatus;

    fn btc_usdt() -> TradingPair {
        TradingPair::new(
            Symbol::new("BTC/USDT"),
            2,
            4,
            Quantity::from_str("0.001").unwrap(),
            Decimal::from(10),
        )
    }

    fn limit_request(price: &str, amount: &str) -> OrderRequest {
        OrderRequest::limit(
            UserId::new(),
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Price::from_str(price).unwrap(),
            Quantity::from_str(amount).unwrap(),
        )
    }

    #[test]
    fn test_validate_passes() {
        let pair = btc_usdt();
        let request = limit_request("50000.25", "0.1");
        assert!(validate(&pair, &request, None).is_ok());
    }

    #[test]
    fn test_validate_suspended_pair() {
        let mut pair = btc_usdt();
        pair.status = PairStatus::SUSPENDED;
        let request = limit_request("50000", "0.1");
        assert!(matches!(
            validate(&pair, &request, None),
            Err(ValidationError::SymbolSuspended { .. })
        ));
    }

    #[test]
    fn test_validate_price_precision() {
        let pair = btc_usdt();
        let request = limit_request("50000.255", "0.1");
        assert_eq!(
            validate(&pair, &request, None),
            Err(ValidationError::PricePrecision { max: 2 })
        );
    }

    #[test]
    fn test_validate_amount_precision() {
        let pair = btc_usdt();
        let request = limit_request("50000", "0.12345");
        assert_eq!(
            validate(&pair, &request, None),
            Err(ValidationError::AmountPrecision { max: 4 })
        );
    }

    #[test]
    fn test_validate_min_amount() {
        let pair = btc_usdt();
        let request = limit_request("50000", "0.0005");
        assert!(matches!(
            validate(&pair, &request, None),
            Err(ValidationError::BelowMinAmount { .. })
        ));
    }

    #[test]
    fn test_validate_min_notional() {
        let pair = btc_usdt();
        // 1.25 × 0.002 = 0.0025, below the 10 USDT minimum
        let request = limit_request("1.25", "0.002");
        assert!(matches!(
            validate(&pair, &request, None),
            Err(ValidationError::BelowMinNotional { .. })
        ));
    }

    #[test]
    fn test_validate_market_uses_best_price_for_notional() {
        let pair = btc_usdt();
        let request = OrderRequest::market(
            UserId::new(),
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Quantity::from_str("0.002").unwrap(),
        );

        // With a best ask of 1.25 the notional is below minimum
        assert!(matches!(
            validate(&pair, &request, Some(Price::from_str("1.25").unwrap())),
            Err(ValidationError::BelowMinNotional { .. })
        ));

        // Against an empty book the notional check is skipped
        assert!(validate(&pair, &request, None).is_ok());
    }

    #[test]
    fn test_validate_limit_requires_price() {
        let pair = btc_usdt();
        let mut request = limit_request("50000", "0.1");
        request.price = None;
        assert_eq!(
            validate(&pair, &request, None),
            Err(ValidationError::MissingPrice)
        );
    }
}
