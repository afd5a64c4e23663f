//! Checked add/sub/mul/div for the native amount width and the wide
//! accumulator width, plus the narrowing cast between them.

use crate::{MathError, Result};

/// Checked u64 addition.
pub fn add_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(MathError::AddOverflow {
        a: a as u128,
        b: b as u128,
    })
}

/// Checked u64 subtraction.
pub fn sub_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or(MathError::SubUnderflow {
        a: a as u128,
        b: b as u128,
    })
}

/// Checked u64 multiplication.
pub fn mul_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_mul(b).ok_or(MathError::MulOverflow {
        a: a as u128,
        b: b as u128,
    })
}

/// Checked u64 division.
pub fn div_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_div(b).ok_or(MathError::DivideByZero)
}

/// Checked u128 addition.
pub fn add_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(MathError::AddOverflow { a, b })
}

/// Checked u128 subtraction.
pub fn sub_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(MathError::SubUnderflow { a, b })
}

/// Checked u128 multiplication.
pub fn mul_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b).ok_or(MathError::MulOverflow { a, b })
}

/// Checked u128 division.
pub fn div_u128(a: u128, b: u128) -> Result<u128> {
    a.checked_div(b).ok_or(MathError::DivideByZero)
}

/// Narrow a wide accumulator value back to the native amount width.
///
/// # Errors
///
/// - [`MathError::Narrow`] if the value exceeds `u64::MAX`
pub fn narrow(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| MathError::Narrow(value))
}
