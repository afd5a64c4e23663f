//! # melt-types
//!
//! Shared domain types for the meltwater liquid-staking core.
//!
//! All record kinds the hosting ledger persists live here: the global bucket
//! singleton, the reward farm singleton, per-account staker rows, epoch
//! records, redemption requests, and the outbox entries that describe token
//! movements for the host to execute after commit.
//!
//! ## Modules
//!
//! - [`config`] — protocol configuration and its validation
//! - [`global`] — the global bucket singleton
//! - [`farm`] — reward farm singleton and staker accounts
//! - [`epoch`] — lending-window records
//! - [`request`] — redemption requests
//! - [`transfer`] — outbox token transfers

pub mod config;
pub mod epoch;
pub mod farm;
pub mod global;
pub mod request;
pub mod transfer;

pub use config::{ConfigError, ProtocolConfig};
pub use epoch::EpochRecord;
pub use farm::{RewardFarm, StakerAccount};
pub use global::GlobalState;
pub use request::RedemptionRequest;
pub use transfer::{TokenKind, TokenTransfer};

/// Common type aliases.
pub type AccountId = String;
pub type TokenAmount = u64;
pub type WideAmount = u128;
pub type Timestamp = u64;

/// Raw units per whole token (1 token = 100,000,000 units).
pub const UNITS_PER_TOKEN: TokenAmount = 100_000_000;

/// Largest acceptable token amount (2^62 - 1), the hosting ledger's bound.
pub const MAX_TOKEN_AMOUNT: TokenAmount = 4_611_686_018_427_387_903;

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Grace period subtracted from a window's end to form its unwind deadline.
pub const UNWIND_GRACE_SECS: u64 = 3 * SECONDS_PER_DAY;

/// Convert a day count to seconds.
pub const fn days_to_seconds(days: u64) -> u64 {
    days * SECONDS_PER_DAY
}
