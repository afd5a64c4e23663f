//! # melt-farm
//!
//! The staking reward farm: a rate-based drip of revenue to staked
//! principal over fixed reward periods.
//!
//! Rewards accrue through a global accumulator (`reward_per_token_stored`,
//! scaled by 1e16) that advances with time and is snapshotted per account.
//! An account's yield since its last touch is priced as
//! `balance * (accumulator - snapshot) / 1e16`, so every state-changing
//! call must bring the account current *before* changing its balance.
//!
//! When a period ends, [`extend_period`] rolls the farm into the next one:
//! pending revenue is split into user, treasury, and ecosystem shares and
//! the user share becomes the new drip rate. With nothing pending the farm
//! skips forward by whole periods at a zero rate.

use melt_math::MathError;
use melt_ratio::RatioError;

mod accrual;
mod distribute;

pub use accrual::{earned, projected_claimable, reward_per_token, update_account};
pub use distribute::{extend_period, Distribution};

/// Error types for the reward farm.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FarmError {
    /// Cumulative payouts would exceed cumulative funding. Invariant
    /// violation; the host must discard the call's writes.
    #[error("overdrawn reward pool: paid out {paid_out}, funded {funded}")]
    OverdrawnRewardPool {
        /// Cumulative rewards credited, including the offending credit.
        paid_out: u64,
        /// Cumulative funding ever routed into the farm.
        funded: u64,
    },

    /// A distribution's share allocations sum past the distributed total.
    /// Invariant violation; the host must discard the call's writes.
    #[error("overallocated distribution: {allocated} of {total}")]
    OverallocatedDistribution {
        /// Sum of the user, treasury, and ecosystem allocations.
        allocated: u64,
        /// The amount being distributed.
        total: u64,
    },

    /// Arithmetic failure in reward math.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Conversion failure while minting the ecosystem share.
    #[error(transparent)]
    Ratio(#[from] RatioError),
}

/// Convenience result type for farm operations.
pub type Result<T> = std::result::Result<T, FarmError>;
