//! Widen-then-divide primitives.
//!
//! `floor(a * b / denominator)` with the product computed at double width so
//! that `a * b` never overflows the native amount width even when the final
//! result fits. All percentage and share math routes through [`asset_share`].

use crate::{checked, MathError, Result, ONE_HUNDRED_PERCENT_1E6};

/// Compute `floor(a * b / denominator)` with a u128 intermediate product.
///
/// # Errors
///
/// - [`MathError::DivideByZero`] if `denominator` is zero
/// - [`MathError::Narrow`] if the result does not fit in 64 bits
pub fn mul_div(a: u64, b: u64, denominator: u128) -> Result<u64> {
    if denominator == 0 {
        return Err(MathError::DivideByZero);
    }
    let prod = (a as u128) * (b as u128);
    checked::narrow(prod / denominator)
}

/// Compute `floor(a * b / denominator)` entirely at accumulator width.
///
/// Used for the reward-rate and reward-per-token paths where the operands
/// are already u128-scaled.
///
/// # Errors
///
/// - [`MathError::MulOverflow`] if `a * b` overflows u128
/// - [`MathError::DivideByZero`] if `denominator` is zero
pub fn mul_div_wide(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(MathError::DivideByZero);
    }
    let prod = checked::mul_u128(a, b)?;
    Ok(prod / denominator)
}

/// Compute the portion of `amount` belonging to a 1e6-scaled percentage.
///
/// `share_1e6` uses the system-wide scale: 1% = 1_000_000, 100% =
/// [`ONE_HUNDRED_PERCENT_1E6`]. A zero amount yields zero.
pub fn asset_share(amount: u64, share_1e6: u64) -> Result<u64> {
    if amount == 0 {
        return Ok(0);
    }
    mul_div(amount, share_1e6, ONE_HUNDRED_PERCENT_1E6 as u128)
}
