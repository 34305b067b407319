//! Bounds of the `NUMERIC(10, 2)` money columns.

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

/// Largest amount a `NUMERIC(10, 2)` column stores: 99,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

const MAX_SCALE: u32 = 2;

/// A menu price: positive, whole cents, within the column range.
pub fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    if price.normalize().scale() > MAX_SCALE {
        return Err(AppError::BadRequest(
            "price must have at most 2 decimal places".into(),
        ));
    }
    ensure_storable(price, "price")
}

/// Reject computed amounts the store cannot hold.
pub fn ensure_storable(amount: Decimal, what: &str) -> AppResult<()> {
    if amount.abs() > MAX_AMOUNT {
        return Err(AppError::BadRequest(format!(
            "{what} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn max_amount_is_the_column_limit() {
        assert_eq!(MAX_AMOUNT, Decimal::new(9_999_999_999, 2));
    }

    #[test]
    fn price_must_be_positive() {
        assert!(validate_price(dec("0.01")).is_ok());
        assert!(matches!(
            validate_price(Decimal::ZERO),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_price(dec("-2.50")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn sub_cent_prices_are_rejected() {
        assert!(matches!(
            validate_price(dec("0.001")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_price(dec("12.505")),
            Err(AppError::BadRequest(_))
        ));
        // Trailing zeros are not extra precision.
        assert!(validate_price(dec("12.5000")).is_ok());
    }

    #[test]
    fn prices_above_the_column_range_are_rejected() {
        assert!(validate_price(dec("99999999.99")).is_ok());
        assert!(matches!(
            validate_price(dec("100000000.00")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn storable_amounts_stop_at_the_maximum() {
        assert!(ensure_storable(MAX_AMOUNT, "total").is_ok());
        let err = ensure_storable(dec("120000000.00"), "order total").unwrap_err();
        assert!(err.to_string().contains("order total exceeds"));
    }
}
