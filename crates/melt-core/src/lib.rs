//! # melt-core
//!
//! The protocol state machine tying the accounting components together.
//!
//! [`Protocol`] owns the whole persistent state: configuration, the global
//! buckets, the reward farm, staker rows, window records, and redemption
//! requests. The host hands it one call at a time; on `Ok` it persists the
//! struct and performs the queued outbox transfers, on `Err` it discards
//! every write. Entry points therefore never need to roll anything back.
//!
//! Every state-changing call runs the same prelude: catch the window
//! pointer up, roll the reward period if it ended, and bring the touched
//! accounts current with the farm before their balances change.

use melt_epoch::EpochError;
use melt_farm::FarmError;
use melt_math::MathError;
use melt_ratio::RatioError;
use melt_redeem::RedeemError;
use melt_types::{AccountId, ConfigError, Timestamp, TokenAmount};

mod admin;
mod exit;
mod lending;
mod memo;
mod protocol;
mod stake;
mod views;

pub use memo::Memo;
pub use protocol::Protocol;

/// Error type aggregating every way a call can abort.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The account has never staked here.
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    /// A zero amount, or one past the ledger's bound.
    #[error("invalid amount {0}")]
    InvalidAmount(TokenAmount),

    /// The amount is below an operation's configured minimum.
    #[error("amount {amount} is below the minimum of {minimum}")]
    BelowMinimum {
        /// The rejected amount.
        amount: TokenAmount,
        /// The configured floor.
        minimum: TokenAmount,
    },

    /// The account has no claimable yield.
    #[error("nothing to claim")]
    NothingToClaim,

    /// A slippage parameter at or past 100%.
    #[error("max slippage {0} is out of range")]
    SlippageOutOfRange(u64),

    /// A conversion came out under the caller's acceptable floor.
    #[error("output would be {output} but at least {minimum} was expected")]
    SlippageExceeded {
        /// What the conversion would produce.
        output: TokenAmount,
        /// The caller's floor.
        minimum: TokenAmount,
    },

    /// The staked balance cannot cover the operation.
    #[error("balance {balance} cannot cover {requested}")]
    InsufficientBalance {
        /// Staked balance.
        balance: TokenAmount,
        /// Amount asked for.
        requested: TokenAmount,
    },

    /// The lendable bucket cannot cover the operation.
    #[error("lendable balance {lendable} cannot cover {requested}")]
    InsufficientLendable {
        /// The lendable bucket.
        lendable: TokenAmount,
        /// Amount asked for.
        requested: TokenAmount,
    },

    /// The deposit memo matches no known operation.
    #[error("unexpected memo {0:?}, see the protocol docs for accepted memos")]
    UnknownMemo(String),

    /// A pipe-delimited memo is missing or mangling a field.
    #[error("malformed memo: {0}")]
    MalformedMemo(String),

    /// The deposited token does not match the memo's operation.
    #[error("wrong token for the {operation} operation")]
    WrongToken {
        /// The operation that rejected the token.
        operation: String,
    },

    /// The caller lacks admin permissions.
    #[error("{0} is not an admin")]
    NotAuthorized(AccountId),

    /// The sender is not a configured provider.
    #[error("{0} is not a lending provider")]
    NotAProvider(AccountId),

    /// The provider still holds the current window and cannot be removed.
    #[error("{0} holds the current lending window")]
    ProviderInUse(AccountId),

    /// The account is already in the list being added to.
    #[error("{0} is already configured")]
    AlreadyConfigured(AccountId),

    /// The account is not in the list being removed from.
    #[error("{0} is not configured")]
    NotConfigured(AccountId),

    /// The lending commit interval has not elapsed.
    #[error("next lending commit is not until {next_commit_time}")]
    CommitTooSoon {
        /// Earliest allowed commit time.
        next_commit_time: Timestamp,
    },

    /// The redemption window has closed.
    #[error("next redemption does not start until {next_window}")]
    RedemptionClosed {
        /// When the next window opens.
        next_window: Timestamp,
    },

    /// The redemption window has not closed yet.
    #[error("redemption period does not end until {ends}")]
    RedemptionStillOpen {
        /// When the open window ends.
        ends: Timestamp,
    },

    /// The lendable bucket is empty.
    #[error("no lendable balance to commit")]
    NothingToCommit,

    /// The redemption pool is empty.
    #[error("there is nothing to reallocate")]
    NothingToReallocate,

    /// No request exists against the window being redeemed.
    #[error("no redemption request against window {0}")]
    NoRedemptionRequest(Timestamp),

    /// A rental size outside the accepted whole-token bounds.
    #[error("rental of {whole_tokens} whole tokens is outside {min}..={max}")]
    RentBounds {
        /// The rejected size.
        whole_tokens: u64,
        /// Smallest rentable size.
        min: u64,
        /// Largest rentable size.
        max: u64,
    },

    /// The rental payment does not cover the computed price.
    #[error("rental costs {required} but {paid} was sent")]
    RentUnderpaid {
        /// The computed price.
        required: TokenAmount,
        /// What the renter sent.
        paid: TokenAmount,
    },

    /// Configuration validation failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Arithmetic failure.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Conversion-ratio failure.
    #[error(transparent)]
    Ratio(#[from] RatioError),

    /// Reward-farm failure.
    #[error(transparent)]
    Farm(#[from] FarmError),

    /// Lending-window failure.
    #[error(transparent)]
    Epoch(#[from] EpochError),

    /// Redemption-queue failure.
    #[error(transparent)]
    Redeem(#[from] RedeemError),
}

/// Convenience result type for protocol calls.
pub type Result<T> = std::result::Result<T, CoreError>;
