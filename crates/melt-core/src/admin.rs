//! Admin-gated configuration changes.
//!
//! The admin list is seeded in the initial configuration; after that,
//! admins manage the lists and knobs themselves. Every mutation is applied
//! to a working copy and validated before it replaces the live
//! configuration.

use melt_math::ONE_HUNDRED_PERCENT_1E6;
use melt_types::{ConfigError, Timestamp, TokenAmount};

use crate::{CoreError, Protocol, Result};

/// Smallest allowed treasury share, 1e6-scaled.
pub const MIN_TREASURY_SHARE_1E6: u64 = 5_000_000;

/// Largest allowed treasury share, 1e6-scaled.
pub const MAX_TREASURY_SHARE_1E6: u64 = 10_000_000;

impl Protocol {
    /// Grant `account` admin permissions.
    pub fn add_admin(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.config.is_admin(account) {
            return Err(CoreError::AlreadyConfigured(account.to_string()));
        }
        self.config.admins.push(account.to_string());
        tracing::debug!(caller, account, "admin added");
        Ok(())
    }

    /// Revoke `account`'s admin permissions.
    pub fn remove_admin(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require_admin(caller)?;
        if !self.config.is_admin(account) {
            return Err(CoreError::NotConfigured(account.to_string()));
        }
        self.config.admins.retain(|a| a != account);
        tracing::debug!(caller, account, "admin removed");
        Ok(())
    }

    /// Append `account` to the provider ring.
    pub fn add_provider(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.config.is_provider(account) {
            return Err(CoreError::AlreadyConfigured(account.to_string()));
        }
        let mut config = self.config.clone();
        config.providers.push(account.to_string());
        config.validate()?;
        self.config = config;
        tracing::debug!(caller, account, "provider added");
        Ok(())
    }

    /// Remove `account` from the provider ring.
    ///
    /// The provider holding the newest window cannot be removed; rotation
    /// would have no position to advance from.
    pub fn remove_provider(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require_admin(caller)?;
        if !self.config.is_provider(account) {
            return Err(CoreError::NotConfigured(account.to_string()));
        }
        if account == self.global.current_provider {
            return Err(CoreError::ProviderInUse(account.to_string()));
        }
        let mut config = self.config.clone();
        config.providers.retain(|p| p != account);
        config.validate()?;
        self.config = config;
        tracing::debug!(caller, account, "provider removed");
        Ok(())
    }

    /// Adjust the treasury share. The user share absorbs the difference so
    /// the split keeps summing to 100%.
    pub fn set_treasury_share(&mut self, caller: &str, share_1e6: u64) -> Result<()> {
        self.require_admin(caller)?;
        if !(MIN_TREASURY_SHARE_1E6..=MAX_TREASURY_SHARE_1E6).contains(&share_1e6) {
            return Err(CoreError::Config(ConfigError::ShareOutOfRange {
                share_1e6,
                min_1e6: MIN_TREASURY_SHARE_1E6,
                max_1e6: MAX_TREASURY_SHARE_1E6,
            }));
        }
        let mut config = self.config.clone();
        config.treasury_share_1e6 = share_1e6;
        config.user_share_1e6 =
            ONE_HUNDRED_PERCENT_1E6 - share_1e6 - config.ecosystem_share_1e6;
        config.validate()?;
        self.config = config;
        tracing::debug!(caller, share_1e6, "treasury share set");
        Ok(())
    }

    /// Set the rental price per whole token per day.
    pub fn set_rent_price(
        &mut self,
        caller: &str,
        cost_per_unit_day: TokenAmount,
        now: Timestamp,
    ) -> Result<()> {
        self.require_admin(caller)?;
        Self::validate_amount(cost_per_unit_day)?;
        self.advance(now)?;
        self.global.rent_cost_per_unit_day = cost_per_unit_day;
        tracing::debug!(caller, cost_per_unit_day, "rent price set");
        Ok(())
    }

    /// Set the receiver of committed capital when no renter claimed it.
    pub fn set_fallback_receiver(&mut self, caller: &str, account: &str) -> Result<()> {
        self.require_admin(caller)?;
        self.config.fallback_receiver = account.to_string();
        tracing::debug!(caller, account, "fallback receiver set");
        Ok(())
    }

    fn require_admin(&self, caller: &str) -> Result<()> {
        if !self.config.is_admin(caller) {
            return Err(CoreError::NotAuthorized(caller.to_string()));
        }
        Ok(())
    }
}
