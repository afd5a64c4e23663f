//! Exit paths: queued redemption, open-window claims, and instant exits.

use melt_math::{asset_share, checked};
use melt_types::{Timestamp, TokenAmount, TokenTransfer};

use crate::{CoreError, Protocol, Result};

impl Protocol {
    /// Request an exit of `amount` staked tokens.
    ///
    /// Whatever the open redemption window and the live windows' slack can
    /// absorb is settled or reserved there; a remainder is paid instantly
    /// out of the lendable balance. `replace_existing` tears down standing
    /// requests first instead of rejecting.
    pub fn request_exit(
        &mut self,
        user: &str,
        amount: TokenAmount,
        replace_existing: bool,
        now: Timestamp,
    ) -> Result<()> {
        Self::validate_amount(amount)?;
        self.advance(now)?;

        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        let store = self.requests.entry(user.to_string()).or_default();
        let outcome = melt_redeem::request_exit(
            &self.config,
            &mut self.global,
            &mut self.epochs,
            store,
            &mut staker,
            amount,
            replace_existing,
            now,
        )?;
        self.put_staker(staker);

        // Settled and instant portions leave the staked supply now;
        // queued amounts keep earning until claimed.
        let paid = checked::add_u64(outcome.settled, outcome.instant)?;
        if paid > 0 {
            self.burn_stake(paid)?;
            self.outbox
                .push(TokenTransfer::base(user, paid, "your redemption"));
        }

        tracing::debug!(
            user,
            amount,
            settled = outcome.settled,
            queued = outcome.queued,
            instant = outcome.instant,
            "exit requested"
        );
        Ok(())
    }

    /// Claim the account's request in the currently open redemption window.
    pub fn claim_redemption(&mut self, user: &str, now: Timestamp) -> Result<()> {
        self.advance(now)?;

        let window_end = self.global.last_epoch_start + self.config.redemption_window_secs;
        if now >= window_end {
            return Err(CoreError::RedemptionClosed {
                next_window: self.global.last_epoch_start + self.config.epoch_spacing_secs,
            });
        }
        let claim_from = self
            .global
            .last_epoch_start
            .saturating_sub(self.config.lending_duration_secs);

        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        let store = self.requests.entry(user.to_string()).or_default();
        let mut remaining = 0;
        let settlement = melt_redeem::settle_open_window(
            &self.config,
            &mut self.global,
            &mut self.epochs,
            store,
            &mut staker,
            &mut remaining,
            now,
        )?
        .ok_or(CoreError::NoRedemptionRequest(claim_from))?;
        self.put_staker(staker);

        self.burn_stake(settlement.paid)?;
        self.outbox
            .push(TokenTransfer::base(user, settlement.paid, "your redemption"));

        tracing::debug!(user, paid = settlement.paid, "redemption claimed");
        Ok(())
    }

    /// Exit instantly out of the lendable balance, paying the protocol fee.
    pub fn insta_redeem(&mut self, user: &str, amount: TokenAmount, now: Timestamp) -> Result<()> {
        Self::validate_amount(amount)?;
        self.advance(now)?;

        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;
        if staker.balance < amount {
            return Err(CoreError::InsufficientBalance {
                balance: staker.balance,
                requested: amount,
            });
        }
        if self.global.available_for_lending < amount {
            return Err(CoreError::InsufficientLendable {
                lendable: self.global.available_for_lending,
                requested: amount,
            });
        }

        let fee = asset_share(amount, self.config.protocol_fee_1e6)?;
        let payout = checked::sub_u64(amount, fee)?;

        staker.balance -= amount;
        self.burn_stake(amount)?;
        self.global.available_for_lending -= amount;
        self.global.pending_revenue = checked::add_u64(self.global.pending_revenue, fee)?;

        let new_balance = staker.balance;
        self.put_staker(staker);
        self.outbox
            .push(TokenTransfer::base(user, payout, "your instant redemption"));

        let store = self.requests.entry(user.to_string()).or_default();
        melt_redeem::debit_if_overdrawn(
            &self.config,
            &self.global,
            &mut self.epochs,
            store,
            new_balance,
        )?;

        tracing::debug!(user, amount, fee, payout, "instant redemption");
        Ok(())
    }

    /// Drop the account's requests against long-closed windows.
    pub fn clear_expired_requests(&mut self, user: &str, now: Timestamp) -> Result<usize> {
        self.advance(now)?;
        let store = self
            .requests
            .get_mut(user)
            .ok_or(CoreError::Redeem(melt_redeem::RedeemError::NothingToClear))?;
        let cleared = melt_redeem::clear_expired(&self.config, &self.global, store)?;
        tracing::debug!(user, cleared, "expired requests cleared");
        Ok(cleared)
    }
}
