//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted
//! to `f64` for storage/serialization. Order totals are always recomputed
//! from their lines, never accumulated incrementally.

use super::error::OrderingError;
use crate::db::models::OrderLine;
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price per listing
const MAX_PRICE: f64 = 100_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for precise arithmetic
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// unit_price × quantity
pub fn line_amount(unit_price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Σ line.final_amount over the lines attached to one order
pub fn order_total(lines: &[OrderLine]) -> f64 {
    let sum = lines
        .iter()
        .fold(Decimal::ZERO, |acc, line| acc + to_decimal(line.final_amount));
    to_f64(sum)
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn amounts_equal(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

/// Validate a requested line before processing
pub fn validate_line(product_id: &str, quantity: i32) -> Result<(), OrderingError> {
    if product_id.is_empty() {
        return Err(OrderingError::Validation("product_id is empty".into()));
    }
    if quantity <= 0 {
        return Err(OrderingError::Validation(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(OrderingError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }
    Ok(())
}

/// Validate a listing price read from storage
pub fn validate_price(price: f64) -> Result<(), OrderingError> {
    if !price.is_finite() {
        return Err(OrderingError::Validation(format!(
            "price must be a finite number, got {}",
            price
        )));
    }
    if price < 0.0 {
        return Err(OrderingError::Validation(format!(
            "price must be non-negative, got {}",
            price
        )));
    }
    if price > MAX_PRICE {
        return Err(OrderingError::Validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, price
        )));
    }
    Ok(())
}
