//! Protocol configuration.
//!
//! The configuration travels with the ledger state and is mutated only by
//! admin operations. [`validate`](ProtocolConfig::validate) must hold after
//! every mutation; an overallocated share split or an empty provider ring is
//! an inconsistency in the accounting model, not a user error.

use serde::{Deserialize, Serialize};

use crate::{days_to_seconds, AccountId, TokenAmount, Timestamp, UNITS_PER_TOKEN};

/// One hundred percent in 1e6-scaled percentage points.
const ONE_HUNDRED_PERCENT_1E6: u64 = 100_000_000;

/// Error types for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The user/treasury/ecosystem shares sum past 100%.
    #[error("share split sums to {total_1e6} of {max_1e6} (1e6-scaled)")]
    OverallocatedShares {
        /// Sum of the three shares.
        total_1e6: u64,
        /// The 100% bound.
        max_1e6: u64,
    },

    /// The provider ring is empty or holds duplicates.
    #[error("invalid provider ring: {0}")]
    InvalidProviders(String),

    /// A duration field is zero or inconsistent with its peers.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// A share adjustment fell outside its allowed range.
    #[error("share {share_1e6} outside allowed range {min_1e6}..={max_1e6}")]
    ShareOutOfRange {
        /// The rejected value.
        share_1e6: u64,
        /// Lower bound.
        min_1e6: u64,
        /// Upper bound.
        max_1e6: u64,
    },
}

/// Protocol configuration, mutated only by admin operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Smallest accepted stake deposit.
    pub minimum_stake: TokenAmount,
    /// Smallest accepted unliquify amount.
    pub minimum_unliquify: TokenAmount,
    /// Timestamp of the first lending window.
    pub initial_epoch_start: Timestamp,
    /// Length of one lending window in seconds.
    pub lending_duration_secs: u64,
    /// Spacing between window starts in seconds (windows overlap).
    pub epoch_spacing_secs: u64,
    /// Length of each window's redemption period in seconds.
    pub redemption_window_secs: u64,
    /// Length of one reward period in seconds.
    pub rewards_duration_secs: u64,
    /// Minimum interval between lending commits in seconds.
    pub commit_interval_secs: u64,
    /// How early the not-yet-open window accepts rentals, in seconds.
    pub next_window_rent_lead_secs: u64,
    /// Stakers' share of each distribution, 1e6-scaled.
    pub user_share_1e6: u64,
    /// Treasury share of each distribution, 1e6-scaled.
    pub treasury_share_1e6: u64,
    /// Ecosystem share of each distribution, 1e6-scaled.
    pub ecosystem_share_1e6: u64,
    /// Instant-redemption fee, 1e6-scaled.
    pub protocol_fee_1e6: u64,
    /// Accounts with elevated (non-owner) permissions.
    pub admins: Vec<AccountId>,
    /// Lending-window providers, rotated round-robin.
    pub providers: Vec<AccountId>,
    /// Treasury contract: receives the treasury share and drives the
    /// vault-balance flows (instant redeem, rebalance, liquidity).
    pub treasury_account: AccountId,
    /// Receiver of committed capital when no renter claimed it.
    pub fallback_receiver: AccountId,
    /// The distinguished account backing the liquid wrapper.
    pub vault_account: AccountId,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            minimum_stake: UNITS_PER_TOKEN,
            minimum_unliquify: UNITS_PER_TOKEN,
            initial_epoch_start: 0,
            lending_duration_secs: days_to_seconds(14),
            epoch_spacing_secs: days_to_seconds(7),
            redemption_window_secs: days_to_seconds(2),
            rewards_duration_secs: days_to_seconds(1),
            commit_interval_secs: days_to_seconds(1),
            next_window_rent_lead_secs: days_to_seconds(4),
            user_share_1e6: 85_000_000,
            treasury_share_1e6: 7_000_000,
            ecosystem_share_1e6: 8_000_000,
            protocol_fee_1e6: 50_000,
            admins: Vec::new(),
            providers: vec![
                "lender.one".to_string(),
                "lender.two".to_string(),
                "lender.three".to_string(),
            ],
            treasury_account: "treasury".to_string(),
            fallback_receiver: "standby".to_string(),
            vault_account: "vault".to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::OverallocatedShares`] if the three shares sum past 100%
    /// - [`ConfigError::InvalidProviders`] if the ring is empty or has duplicates
    /// - [`ConfigError::InvalidDuration`] on zero or inconsistent durations
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.user_share_1e6 + self.treasury_share_1e6 + self.ecosystem_share_1e6;
        if total > ONE_HUNDRED_PERCENT_1E6 {
            return Err(ConfigError::OverallocatedShares {
                total_1e6: total,
                max_1e6: ONE_HUNDRED_PERCENT_1E6,
            });
        }

        if self.providers.is_empty() {
            return Err(ConfigError::InvalidProviders("ring is empty".to_string()));
        }
        for (i, p) in self.providers.iter().enumerate() {
            if self.providers[i + 1..].contains(p) {
                return Err(ConfigError::InvalidProviders(format!(
                    "duplicate provider {p}"
                )));
            }
        }

        if self.lending_duration_secs == 0
            || self.epoch_spacing_secs == 0
            || self.rewards_duration_secs == 0
            || self.redemption_window_secs == 0
        {
            return Err(ConfigError::InvalidDuration(
                "durations must be non-zero".to_string(),
            ));
        }
        if self.epoch_spacing_secs > self.lending_duration_secs {
            return Err(ConfigError::InvalidDuration(
                "epoch spacing exceeds lending duration".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `account` carries admin permissions.
    pub fn is_admin(&self, account: &str) -> bool {
        self.admins.iter().any(|a| a == account)
    }

    /// Whether `account` is one of the lending providers.
    pub fn is_provider(&self, account: &str) -> bool {
        self.providers.iter().any(|p| p == account)
    }
}
