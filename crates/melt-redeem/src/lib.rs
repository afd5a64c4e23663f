//! # melt-redeem
//!
//! The redemption queue: exit requests reserved against the three live
//! lending windows, settled when a window's redemption period opens.
//!
//! A request earmarks part of a window's bucket so the provider returns
//! that capital to the redemption pool instead of re-lending it. The
//! standing invariant is conservation: the sum of outstanding requests
//! against a window always equals that window's earmark. Every mutation
//! here moves a request amount and its earmark together.

use std::collections::BTreeMap;

use melt_math::MathError;
use melt_types::{RedemptionRequest, Timestamp, TokenAmount};

mod queue;

pub use queue::{
    clear_expired, debit_if_overdrawn, request_exit, settle_open_window, ExitOutcome,
    OpenWindowSettlement,
};

/// One account's requests, keyed by the window they are reserved against.
pub type RequestStore = BTreeMap<Timestamp, RedemptionRequest>;

/// Error types for the redemption queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    /// The account's staked balance cannot cover the request.
    #[error("redeeming {requested} with only {balance} staked")]
    InsufficientStake {
        /// Staked balance.
        balance: TokenAmount,
        /// Amount still to fill.
        requested: TokenAmount,
    },

    /// A standing request exceeds the account's staked balance. Invariant
    /// violation; the host must discard the call's writes.
    #[error("pending request of {requested} exceeds staked balance {balance}")]
    RequestExceedsBalance {
        /// Staked balance.
        balance: TokenAmount,
        /// The standing request amount.
        requested: TokenAmount,
    },

    /// The redemption pool cannot cover a request whose window is open.
    /// Transient: lending capital has not been returned yet.
    #[error("redemption pool holds {pool}, request needs {requested}")]
    RedemptionPoolShort {
        /// Current redemption pool.
        pool: TokenAmount,
        /// The request amount due.
        requested: TokenAmount,
    },

    /// The account has standing requests and did not opt into replacing
    /// them.
    #[error("standing requests exist; pass replace_existing to tear them down")]
    ExistingRequests,

    /// Neither the live windows nor the lendable balance can cover the
    /// remainder of an exit.
    #[error("queue exhausted: {remaining} unfillable, lendable balance {lendable}")]
    QueueExhausted {
        /// Amount no window could absorb.
        remaining: TokenAmount,
        /// The lendable balance that was asked to cover it.
        lendable: TokenAmount,
    },

    /// A request and its window's earmark disagree. Invariant violation;
    /// the host must discard the call's writes.
    #[error("window {epoch_id} earmark {earmark} cannot release {amount}")]
    RequestConservation {
        /// The window key.
        epoch_id: Timestamp,
        /// The window's earmark.
        earmark: TokenAmount,
        /// The amount being released from it.
        amount: TokenAmount,
    },

    /// The account has no requests to clear.
    #[error("no requests to clear")]
    NothingToClear,

    /// Arithmetic failure in queue math.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for queue operations.
pub type Result<T> = std::result::Result<T, RedeemError>;
