//! # melt-ratio
//!
//! Stateless conversion between the staked receipt (principal) and its
//! auto-compounding liquid wrapper, priced at the global backing/supply
//! ratio.
//!
//! Both directions round down; the protocol never rounds in the holder's
//! favor, so `to_principal(to_liquid(x)) <= x` always holds. While the
//! backing pool and the liquid supply are equal (the bootstrap state) the
//! ratio is exactly 1:1 and conversion is the identity.

use melt_math::{mul_div, MathError};

/// Error types for ratio conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatioError {
    /// The dividing side of the ratio is zero while the other is not.
    #[error("conversion pool is empty")]
    EmptyPool,

    /// The ratio has degenerated: the scaled numerator no longer exceeds
    /// the denominator, so conversion would collapse the amount to zero.
    #[error("degenerate ratio: numerator {numerator} <= denominator {denominator}")]
    Degenerate {
        /// The widened numerator product.
        numerator: u128,
        /// The division denominator.
        denominator: u128,
    },

    /// Arithmetic failure in the underlying math.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for ratio conversions.
pub type Result<T> = std::result::Result<T, RatioError>;

/// Convert a principal amount into liquid units.
///
/// Returns the input unchanged while `backing_pool == liquid_supply`,
/// otherwise `floor(liquid_supply * principal_amount / backing_pool)`.
///
/// # Errors
///
/// - [`RatioError::EmptyPool`] if the backing pool is zero
/// - [`RatioError::Degenerate`] if the product would floor to zero
pub fn to_liquid(backing_pool: u64, liquid_supply: u64, principal_amount: u64) -> Result<u64> {
    if backing_pool == liquid_supply {
        return Ok(principal_amount);
    }
    if principal_amount == 0 {
        return Ok(0);
    }
    convert(liquid_supply, principal_amount, backing_pool)
}

/// Convert liquid units back into the principal they are backed by.
///
/// Returns the input unchanged while `backing_pool == liquid_supply`,
/// otherwise `floor(backing_pool * liquid_amount / liquid_supply)`.
///
/// # Errors
///
/// - [`RatioError::EmptyPool`] if the liquid supply is zero
/// - [`RatioError::Degenerate`] if the product would floor to zero
pub fn to_principal(backing_pool: u64, liquid_supply: u64, liquid_amount: u64) -> Result<u64> {
    if backing_pool == liquid_supply {
        return Ok(liquid_amount);
    }
    if liquid_amount == 0 {
        return Ok(0);
    }
    convert(backing_pool, liquid_amount, liquid_supply)
}

fn convert(a: u64, b: u64, denominator: u64) -> Result<u64> {
    if denominator == 0 {
        return Err(RatioError::EmptyPool);
    }
    let numerator = (a as u128) * (b as u128);
    if numerator <= denominator as u128 {
        return Err(RatioError::Degenerate {
            numerator,
            denominator: denominator as u128,
        });
    }
    Ok(mul_div(a, b, denominator as u128)?)
}
