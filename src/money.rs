//! Monetary and odds validation.
//!
//! All client-facing amounts arrive as [`Decimal`] and must pass through this
//! module before they reach the persistence layer. Monetary columns carry
//! precision 15.2, odds columns 10.2; arithmetic stays in `Decimal` end to
//! end (never floating point) and rounding is half-up at the persistence
//! boundary.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Fractional digits of monetary columns.
pub const MONEY_SCALE: u32 = 2;
/// Fractional digits of odds columns.
pub const ODDS_SCALE: u32 = 2;
/// Total digits of a monetary column (NUMERIC(15,2)).
const MONEY_PRECISION: u32 = 15;
/// Total digits of an odds column (NUMERIC(10,2)).
const ODDS_PRECISION: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("price must be greater than 1.00, got {0}")]
    PriceTooLow(Decimal),

    #[error("stake must be positive, got {0}")]
    NonPositiveStake(Decimal),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("too many decimal places: {provided} provided, {max} allowed")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("value {0} exceeds column precision")]
    Overflow(Decimal),
}

/// Round to the monetary scale, half-up. Applied exactly once, when a value
/// crosses into the persistence layer.
pub fn quantize_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to the odds scale, half-up.
pub fn quantize_odds(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ODDS_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn check_scale(value: Decimal, max_scale: u32) -> Result<(), MoneyError> {
    // normalize() drops trailing zeros so "2.50" and "2.5000" agree.
    let scale = value.normalize().scale();
    if scale > max_scale {
        return Err(MoneyError::PrecisionOverflow {
            provided: scale,
            max: max_scale,
        });
    }
    Ok(())
}

fn check_precision(value: Decimal, precision: u32, scale: u32) -> Result<(), MoneyError> {
    let limit = Decimal::from(10i64.pow(precision - scale));
    if value.abs() >= limit {
        return Err(MoneyError::Overflow(value));
    }
    Ok(())
}

/// Validate an order price: strictly above 1.00, at most two decimal places,
/// within the odds column range.
pub fn validate_price(price: Decimal) -> Result<Decimal, MoneyError> {
    if price <= Decimal::ONE {
        return Err(MoneyError::PriceTooLow(price));
    }
    check_scale(price, ODDS_SCALE)?;
    check_precision(price, ODDS_PRECISION, ODDS_SCALE)?;
    Ok(quantize_odds(price))
}

/// Validate an order stake: strictly positive, at most two decimal places,
/// within the monetary column range.
pub fn validate_stake(stake: Decimal) -> Result<Decimal, MoneyError> {
    if stake <= Decimal::ZERO {
        return Err(MoneyError::NonPositiveStake(stake));
    }
    check_scale(stake, MONEY_SCALE)?;
    check_precision(stake, MONEY_PRECISION, MONEY_SCALE)?;
    Ok(quantize_money(stake))
}

/// Validate a wallet credit/debit amount.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NonPositiveAmount(amount));
    }
    check_scale(amount, MONEY_SCALE)?;
    check_precision(amount, MONEY_PRECISION, MONEY_SCALE)?;
    Ok(quantize_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn price_at_one_rejected() {
        assert_eq!(
            validate_price(d("1.00")),
            Err(MoneyError::PriceTooLow(d("1.00")))
        );
        assert!(validate_price(d("1.01")).is_ok());
    }

    #[test]
    fn price_below_one_rejected() {
        assert!(validate_price(d("0.99")).is_err());
    }

    #[test]
    fn price_three_decimals_rejected() {
        assert_eq!(
            validate_price(d("2.505")),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
    }

    #[test]
    fn price_trailing_zeros_accepted() {
        assert_eq!(validate_price(d("2.5000")).unwrap(), d("2.50"));
    }

    #[test]
    fn zero_stake_rejected() {
        assert_eq!(
            validate_stake(Decimal::ZERO),
            Err(MoneyError::NonPositiveStake(Decimal::ZERO))
        );
    }

    #[test]
    fn negative_stake_rejected() {
        assert!(validate_stake(d("-5")).is_err());
    }

    #[test]
    fn stake_three_decimals_rejected() {
        assert!(validate_stake(d("10.001")).is_err());
    }

    #[test]
    fn stake_over_precision_rejected() {
        // NUMERIC(15,2) holds up to 13 integer digits.
        assert!(validate_stake(d("10000000000000")).is_err());
        assert!(validate_stake(d("9999999999999")).is_ok());
    }

    #[test]
    fn quantize_rounds_half_up() {
        assert_eq!(quantize_money(d("1.005")), d("1.01"));
        assert_eq!(quantize_money(d("1.004")), d("1.00"));
        assert_eq!(quantize_money(d("2.675")), d("2.68"));
    }

    #[test]
    fn amount_validation() {
        assert!(validate_amount(d("0.01")).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_err());
    }
}
