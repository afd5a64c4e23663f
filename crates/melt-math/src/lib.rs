//! # melt-math
//!
//! Checked arithmetic and fixed-point primitives for the ledger.
//!
//! Every arithmetic operation that could overflow, underflow, wrap, or divide
//! unsafely returns a [`MathError`] instead; nothing saturates silently. The
//! widening paths (`mul_div`, the u128 accumulator helpers) exist so that
//! intermediate products never have to fit in the native 64-bit amount width.
//!
//! ## Modules
//!
//! - [`checked`] — checked add/sub/mul/div for u64 and u128, narrowing casts
//! - [`muldiv`] — widen-then-divide `floor(a*b/denominator)` and share math

pub mod checked;
pub mod muldiv;

pub use checked::{add_u64, add_u128, div_u64, div_u128, mul_u64, mul_u128, narrow, sub_u64, sub_u128};
pub use muldiv::{asset_share, mul_div, mul_div_wide};

/// Scaling factor for percentage points (1% = 1_000_000).
pub const SCALE_1E6: u64 = 1_000_000;

/// Scaling factor used for reward rates and share denominators.
pub const SCALE_1E8: u128 = 100_000_000;

/// Scaling factor for the reward-per-token accumulator.
pub const SCALE_1E16: u128 = 10_000_000_000_000_000;

/// One hundred percent in 1e6-scaled percentage points.
pub const ONE_HUNDRED_PERCENT_1E6: u64 = 100_000_000;

/// Error types for arithmetic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Addition would exceed the representable range.
    #[error("addition would overflow: {a} + {b}")]
    AddOverflow {
        /// Left operand.
        a: u128,
        /// Right operand.
        b: u128,
    },

    /// Subtraction would fall below zero.
    #[error("subtraction would underflow: {a} - {b}")]
    SubUnderflow {
        /// Left operand.
        a: u128,
        /// Right operand.
        b: u128,
    },

    /// Multiplication would exceed the representable range.
    #[error("multiplication would overflow: {a} * {b}")]
    MulOverflow {
        /// Left operand.
        a: u128,
        /// Right operand.
        b: u128,
    },

    /// Division by zero.
    #[error("division by zero")]
    DivideByZero,

    /// A wide value does not fit back into the native amount width.
    #[error("value {0} does not fit in 64 bits")]
    Narrow(u128),
}

/// Convenience result type for arithmetic operations.
pub type Result<T> = std::result::Result<T, MathError>;
