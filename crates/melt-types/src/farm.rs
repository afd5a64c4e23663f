//! Reward farm singleton and per-account staker rows.

use serde::{Deserialize, Serialize};

use crate::{AccountId, TokenAmount, Timestamp, WideAmount};

/// The reward farm singleton.
///
/// `reward_rate` is scaled by 1e8 and `reward_per_token_stored` by 1e16, so
/// that per-second accrual survives integer division for realistic pool
/// sizes. Invariant: `total_paid_out <= reward_pool`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFarm {
    /// Start of the current reward period.
    pub period_start: Timestamp,
    /// End of the current reward period.
    pub period_finish: Timestamp,
    /// Reward units per second, scaled by 1e8.
    pub reward_rate: WideAmount,
    /// Length of one reward period in seconds.
    pub rewards_duration: u64,
    /// Last time the accumulator was brought current.
    pub last_update_time: Timestamp,
    /// Running reward-per-token accumulator, scaled by 1e16.
    pub reward_per_token_stored: WideAmount,
    /// Cumulative funding ever routed into the farm.
    pub reward_pool: TokenAmount,
    /// Sum of all accounts' staked principal.
    pub total_supply: WideAmount,
    /// Cumulative rewards ever credited to accounts.
    pub total_paid_out: TokenAmount,
}

impl RewardFarm {
    /// Fresh farm whose first period starts at `period_start`.
    pub fn new(period_start: Timestamp, rewards_duration: u64) -> Self {
        Self {
            period_start,
            period_finish: period_start + rewards_duration,
            reward_rate: 0,
            rewards_duration,
            last_update_time: period_start,
            reward_per_token_stored: 0,
            reward_pool: 0,
            total_supply: 0,
            total_paid_out: 0,
        }
    }
}

/// One staker's row.
///
/// `paid_per_token` snapshots `reward_per_token_stored` at the account's last
/// update; the difference against the current accumulator prices the yield
/// earned since. Rows are never deleted; balances may fall to zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerAccount {
    /// Account identity.
    pub id: AccountId,
    /// Staked principal balance.
    pub balance: TokenAmount,
    /// Claimable but unclaimed yield.
    pub claimable: TokenAmount,
    /// Last time this row was brought current.
    pub last_update: Timestamp,
    /// Accumulator snapshot from the last update, scaled by 1e16.
    pub paid_per_token: WideAmount,
}

impl StakerAccount {
    /// Open a fresh row with zero balances.
    pub fn open(id: AccountId, now: Timestamp) -> Self {
        Self {
            id,
            balance: 0,
            claimable: 0,
            last_update: now,
            paid_per_token: 0,
        }
    }
}
