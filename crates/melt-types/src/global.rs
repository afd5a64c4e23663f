//! The global bucket singleton.
//!
//! Aggregates every system-wide token bucket. The four quantities
//! `principal_earning`, `principal_backing_liquid`, `liquid_supply`, and the
//! ratio between the last two must stay mutually consistent except in the
//! middle of a single call.

use serde::{Deserialize, Serialize};

use crate::{AccountId, TokenAmount, Timestamp};

/// System-wide buckets and pointers. One instance, mutated by every call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Principal staked by accounts and currently earning yield.
    pub principal_earning: TokenAmount,
    /// Principal held by the vault account, backing the liquid wrapper.
    pub principal_backing_liquid: TokenAmount,
    /// Liquid-wrapper units in circulation.
    pub liquid_supply: TokenAmount,
    /// Revenue received but not yet distributed.
    pub pending_revenue: TokenAmount,
    /// Principal available to commit to the next lending window.
    pub available_for_lending: TokenAmount,
    /// Base tokens reserved for redemption payout.
    pub redemption_pool: TokenAmount,
    /// Cumulative revenue ever distributed.
    pub total_revenue_distributed: TokenAmount,
    /// Cumulative yield ever claimed by accounts.
    pub total_rewards_claimed: TokenAmount,
    /// Liquid units minted for the ecosystem share, held by the protocol.
    pub ecosystem_fund_liquid: TokenAmount,
    /// Start of the most recently opened lending window.
    pub last_epoch_start: Timestamp,
    /// Provider assigned to the most recently opened window.
    pub current_provider: AccountId,
    /// Earliest time the next lending commit may run.
    pub next_commit_time: Timestamp,
    /// Rental price per whole token per day, in base units.
    pub rent_cost_per_unit_day: TokenAmount,
}

impl GlobalState {
    /// Fresh state at protocol initialization.
    pub fn new(
        initial_epoch_start: Timestamp,
        first_provider: AccountId,
        rent_cost_per_unit_day: TokenAmount,
        commit_interval_secs: u64,
    ) -> Self {
        Self {
            principal_earning: 0,
            principal_backing_liquid: 0,
            liquid_supply: 0,
            pending_revenue: 0,
            available_for_lending: 0,
            redemption_pool: 0,
            total_revenue_distributed: 0,
            total_rewards_claimed: 0,
            ecosystem_fund_liquid: 0,
            last_epoch_start: initial_epoch_start,
            current_provider: first_provider,
            next_commit_time: initial_epoch_start + commit_interval_secs,
            rent_cost_per_unit_day,
        }
    }
}
