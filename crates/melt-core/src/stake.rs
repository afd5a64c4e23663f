//! Staking, yield claims, and conversions between staked and liquid.

use melt_math::{asset_share, checked, ONE_HUNDRED_PERCENT_1E6};
use melt_types::{StakerAccount, Timestamp, TokenAmount, TokenTransfer};

use crate::{CoreError, Protocol, Result};

impl Protocol {
    /// Stake a base-token deposit as yield-earning principal.
    pub fn deposit_stake(&mut self, user: &str, amount: TokenAmount, now: Timestamp) -> Result<()> {
        Self::validate_amount(amount)?;
        if amount < self.config.minimum_stake {
            return Err(CoreError::BelowMinimum {
                amount,
                minimum: self.config.minimum_stake,
            });
        }
        self.advance(now)?;

        let mut staker = self
            .accounts
            .get(user)
            .cloned()
            .unwrap_or_else(|| StakerAccount::open(user.to_string(), now));
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        staker.balance = checked::add_u64(staker.balance, amount)?;
        self.mint_stake(amount)?;
        self.global.available_for_lending =
            checked::add_u64(self.global.available_for_lending, amount)?;
        self.put_staker(staker);

        tracing::debug!(user, amount, "stake deposited");
        Ok(())
    }

    /// Pay the account's claimable yield out as base tokens.
    pub fn claim_yield(&mut self, user: &str, now: Timestamp) -> Result<()> {
        self.advance(now)?;
        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        let claim = staker.claimable;
        if claim == 0 {
            return Err(CoreError::NothingToClaim);
        }
        staker.claimable = 0;
        self.global.total_rewards_claimed =
            checked::add_u64(self.global.total_rewards_claimed, claim)?;
        self.put_staker(staker);
        self.outbox
            .push(TokenTransfer::base(user, claim, "your staking yield"));

        tracing::debug!(user, claim, "yield claimed");
        Ok(())
    }

    /// Compound the account's claimable yield into staked principal.
    pub fn claim_as_staked(&mut self, user: &str, now: Timestamp) -> Result<()> {
        self.advance(now)?;
        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        let claim = staker.claimable;
        if claim == 0 {
            return Err(CoreError::NothingToClaim);
        }
        staker.claimable = 0;
        staker.balance = checked::add_u64(staker.balance, claim)?;
        self.mint_stake(claim)?;
        self.global.available_for_lending =
            checked::add_u64(self.global.available_for_lending, claim)?;
        self.global.total_rewards_claimed =
            checked::add_u64(self.global.total_rewards_claimed, claim)?;
        self.put_staker(staker);

        tracing::debug!(user, claim, "yield compounded");
        Ok(())
    }

    /// Convert the account's claimable yield into liquid tokens, gated by
    /// a slippage floor against `expected_output`.
    pub fn claim_as_liquid(
        &mut self,
        user: &str,
        expected_output: TokenAmount,
        max_slippage_1e6: u64,
        now: Timestamp,
    ) -> Result<()> {
        Self::validate_amount(expected_output)?;
        if max_slippage_1e6 >= ONE_HUNDRED_PERCENT_1E6 {
            return Err(CoreError::SlippageOutOfRange(max_slippage_1e6));
        }
        self.advance(now)?;
        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;

        let claim = staker.claimable;
        if claim == 0 {
            return Err(CoreError::NothingToClaim);
        }

        let output = melt_ratio::to_liquid(
            self.global.principal_backing_liquid,
            self.global.liquid_supply,
            claim,
        )?;
        let minimum = asset_share(expected_output, ONE_HUNDRED_PERCENT_1E6 - max_slippage_1e6)?;
        if output < minimum {
            return Err(CoreError::SlippageExceeded { output, minimum });
        }

        staker.claimable = 0;
        self.put_staker(staker);

        // The claimed principal joins the vault's stake backing the
        // liquid supply.
        let mut vault = self.vault()?;
        vault.balance = checked::add_u64(vault.balance, claim)?;
        self.put_staker(vault);
        self.farm.total_supply = checked::add_u128(self.farm.total_supply, u128::from(claim))?;

        self.global.principal_backing_liquid =
            checked::add_u64(self.global.principal_backing_liquid, claim)?;
        self.global.liquid_supply = checked::add_u64(self.global.liquid_supply, output)?;
        self.global.available_for_lending =
            checked::add_u64(self.global.available_for_lending, claim)?;
        self.global.total_rewards_claimed =
            checked::add_u64(self.global.total_rewards_claimed, claim)?;

        self.outbox
            .push(TokenTransfer::liquid(user, output, "your liquid yield"));

        tracing::debug!(user, claim, output, "yield claimed as liquid");
        Ok(())
    }

    /// Convert staked principal into liquid tokens.
    pub fn liquify(&mut self, user: &str, amount: TokenAmount, now: Timestamp) -> Result<()> {
        self.liquify_inner(user, amount, None, now)
    }

    /// [`liquify`](Self::liquify) with a slippage floor against
    /// `expected_output`.
    pub fn liquify_exact(
        &mut self,
        user: &str,
        amount: TokenAmount,
        expected_output: TokenAmount,
        max_slippage_1e6: u64,
        now: Timestamp,
    ) -> Result<()> {
        Self::validate_amount(expected_output)?;
        if max_slippage_1e6 >= ONE_HUNDRED_PERCENT_1E6 {
            return Err(CoreError::SlippageOutOfRange(max_slippage_1e6));
        }
        let minimum = asset_share(expected_output, ONE_HUNDRED_PERCENT_1E6 - max_slippage_1e6)?;
        self.liquify_inner(user, amount, Some(minimum), now)
    }

    fn liquify_inner(
        &mut self,
        user: &str,
        amount: TokenAmount,
        minimum_output: Option<TokenAmount>,
        now: Timestamp,
    ) -> Result<()> {
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

        // Priced before the backing pool grows.
        let output = melt_ratio::to_liquid(
            self.global.principal_backing_liquid,
            self.global.liquid_supply,
            amount,
        )?;
        if let Some(minimum) = minimum_output {
            if output < minimum {
                return Err(CoreError::SlippageExceeded { output, minimum });
            }
        }

        // The principal keeps earning, now on the vault's row.
        staker.balance -= amount;
        let mut vault = self.vault()?;
        melt_farm::update_account(&mut self.farm, &mut vault, now)?;
        vault.balance = checked::add_u64(vault.balance, amount)?;

        self.global.principal_earning =
            checked::sub_u64(self.global.principal_earning, amount)?;
        self.global.principal_backing_liquid =
            checked::add_u64(self.global.principal_backing_liquid, amount)?;
        self.global.liquid_supply = checked::add_u64(self.global.liquid_supply, output)?;

        let new_balance = staker.balance;
        self.put_staker(staker);
        self.put_staker(vault);
        self.outbox
            .push(TokenTransfer::liquid(user, output, "liquified stake"));

        let store = self.requests.entry(user.to_string()).or_default();
        melt_redeem::debit_if_overdrawn(
            &self.config,
            &self.global,
            &mut self.epochs,
            store,
            new_balance,
        )?;

        tracing::debug!(user, amount, output, "stake liquified");
        Ok(())
    }

    /// Convert deposited liquid tokens back into staked principal.
    pub fn unliquify(&mut self, user: &str, amount: TokenAmount, now: Timestamp) -> Result<()> {
        self.unliquify_inner(user, amount, None, now)
    }

    /// [`unliquify`](Self::unliquify) aborting unless at least
    /// `min_output` staked units come out.
    pub fn unliquify_exact(
        &mut self,
        user: &str,
        amount: TokenAmount,
        min_output: TokenAmount,
        now: Timestamp,
    ) -> Result<()> {
        if min_output == 0 || min_output > melt_types::MAX_TOKEN_AMOUNT {
            return Err(CoreError::InvalidAmount(min_output));
        }
        self.unliquify_inner(user, amount, Some(min_output), now)
    }

    fn unliquify_inner(
        &mut self,
        user: &str,
        amount: TokenAmount,
        min_output: Option<TokenAmount>,
        now: Timestamp,
    ) -> Result<()> {
        Self::validate_amount(amount)?;
        if amount < self.config.minimum_unliquify {
            return Err(CoreError::BelowMinimum {
                amount,
                minimum: self.config.minimum_unliquify,
            });
        }
        self.advance(now)?;

        let converted = melt_ratio::to_principal(
            self.global.principal_backing_liquid,
            self.global.liquid_supply,
            amount,
        )?;
        if let Some(minimum) = min_output {
            if converted < minimum {
                return Err(CoreError::SlippageExceeded {
                    output: converted,
                    minimum,
                });
            }
        }

        let mut staker = self.staker(user)?;
        melt_farm::update_account(&mut self.farm, &mut staker, now)?;
        let mut vault = self.vault()?;
        melt_farm::update_account(&mut self.farm, &mut vault, now)?;

        staker.balance = checked::add_u64(staker.balance, converted)?;
        vault.balance = checked::sub_u64(vault.balance, converted)?;
        self.global.liquid_supply = checked::sub_u64(self.global.liquid_supply, amount)?;
        self.global.principal_backing_liquid =
            checked::sub_u64(self.global.principal_backing_liquid, converted)?;
        self.global.principal_earning =
            checked::add_u64(self.global.principal_earning, converted)?;

        self.put_staker(staker);
        self.put_staker(vault);

        tracing::debug!(user, amount, converted, "liquid tokens unliquified");
        Ok(())
    }

    /// Treasury redeeming liquid tokens straight out of the lendable
    /// bucket, fee to pending revenue.
    pub(crate) fn treasury_redeem(
        &mut self,
        amount: TokenAmount,
        reply_memo: &str,
        now: Timestamp,
    ) -> Result<()> {
        if amount < self.config.minimum_unliquify {
            return Err(CoreError::BelowMinimum {
                amount,
                minimum: self.config.minimum_unliquify,
            });
        }
        self.advance(now)?;

        let converted = melt_ratio::to_principal(
            self.global.principal_backing_liquid,
            self.global.liquid_supply,
            amount,
        )?;
        if self.global.available_for_lending < converted {
            return Err(CoreError::InsufficientLendable {
                lendable: self.global.available_for_lending,
                requested: converted,
            });
        }

        let mut vault = self.vault()?;
        melt_farm::update_account(&mut self.farm, &mut vault, now)?;
        vault.balance = checked::sub_u64(vault.balance, converted)?;
        self.put_staker(vault);
        self.farm.total_supply = checked::sub_u128(self.farm.total_supply, u128::from(converted))?;

        let fee = asset_share(converted, self.config.protocol_fee_1e6)?;
        let payout = checked::sub_u64(converted, fee)?;

        self.global.available_for_lending -= converted;
        self.global.pending_revenue = checked::add_u64(self.global.pending_revenue, fee)?;
        self.global.principal_backing_liquid =
            checked::sub_u64(self.global.principal_backing_liquid, converted)?;
        self.global.liquid_supply = checked::sub_u64(self.global.liquid_supply, amount)?;

        self.outbox.push(TokenTransfer::base(
            self.config.treasury_account.clone(),
            payout,
            reply_memo,
        ));

        tracing::debug!(amount, converted, fee, "treasury redeemed liquid tokens");
        Ok(())
    }

    /// Treasury depositing base tokens to mint liquid tokens for
    /// protocol-owned liquidity.
    pub(crate) fn treasury_liquidity(&mut self, amount: TokenAmount, now: Timestamp) -> Result<()> {
        self.advance(now)?;

        let output = melt_ratio::to_liquid(
            self.global.principal_backing_liquid,
            self.global.liquid_supply,
            amount,
        )?;

        let mut vault = self.vault()?;
        melt_farm::update_account(&mut self.farm, &mut vault, now)?;
        vault.balance = checked::add_u64(vault.balance, amount)?;
        self.put_staker(vault);
        self.farm.total_supply = checked::add_u128(self.farm.total_supply, u128::from(amount))?;

        self.global.principal_backing_liquid =
            checked::add_u64(self.global.principal_backing_liquid, amount)?;
        self.global.liquid_supply = checked::add_u64(self.global.liquid_supply, output)?;
        self.global.available_for_lending =
            checked::add_u64(self.global.available_for_lending, amount)?;

        self.outbox.push(TokenTransfer::liquid(
            self.config.treasury_account.clone(),
            output,
            "liquidity",
        ));

        tracing::debug!(amount, output, "treasury liquidity minted");
        Ok(())
    }
}
