//! The protocol state struct, call prelude, and deposit routing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use melt_epoch::EpochStore;
use melt_redeem::RequestStore;
use melt_types::{
    AccountId, EpochRecord, GlobalState, ProtocolConfig, RewardFarm, StakerAccount, Timestamp,
    TokenAmount, TokenKind, TokenTransfer, MAX_TOKEN_AMOUNT,
};

use crate::{CoreError, Memo, Result};

/// The whole persistent protocol state, owned exclusively by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol configuration.
    pub config: ProtocolConfig,
    /// Global bucket singleton.
    pub global: GlobalState,
    /// Reward farm singleton.
    pub farm: RewardFarm,
    /// Staker rows, including the vault's.
    pub accounts: BTreeMap<AccountId, StakerAccount>,
    /// Lending-window records keyed by start time.
    pub epochs: EpochStore,
    /// Per-account redemption requests.
    pub requests: BTreeMap<AccountId, RequestStore>,
    /// Token movements queued for the host to perform after commit.
    pub outbox: Vec<TokenTransfer>,
}

impl Protocol {
    /// Build the initial state: the vault's staker row and the first
    /// lending window, everything else empty.
    pub fn init(
        config: ProtocolConfig,
        rent_cost_per_unit_day: TokenAmount,
        now: Timestamp,
    ) -> Result<Self> {
        config.validate()?;
        let first_provider = config
            .providers
            .first()
            .cloned()
            .ok_or_else(|| CoreError::NotAProvider(String::new()))?;

        let global = GlobalState::new(
            config.initial_epoch_start,
            first_provider.clone(),
            rent_cost_per_unit_day,
            config.commit_interval_secs,
        );
        let farm = RewardFarm::new(config.initial_epoch_start, config.rewards_duration_secs);

        let mut accounts = BTreeMap::new();
        accounts.insert(
            config.vault_account.clone(),
            StakerAccount::open(config.vault_account.clone(), now),
        );

        let mut epochs = EpochStore::new();
        epochs.insert(
            config.initial_epoch_start,
            EpochRecord::create(
                config.initial_epoch_start,
                first_provider,
                0,
                config.lending_duration_secs,
                config.redemption_window_secs,
            ),
        );

        Ok(Self {
            config,
            global,
            farm,
            accounts,
            epochs,
            requests: BTreeMap::new(),
            outbox: Vec::new(),
        })
    }

    /// Create-or-sync a staker row.
    pub fn open_account(&mut self, user: &str, now: Timestamp) -> Result<()> {
        self.advance(now)?;
        if let Some(mut staker) = self.accounts.get(user).cloned() {
            melt_farm::update_account(&mut self.farm, &mut staker, now)?;
            self.put_staker(staker);
        } else {
            self.accounts
                .insert(user.to_string(), StakerAccount::open(user.to_string(), now));
        }
        Ok(())
    }

    /// Route an inbound token transfer by its memo.
    pub fn handle_deposit(
        &mut self,
        from: &str,
        token: TokenKind,
        amount: TokenAmount,
        memo: &str,
        now: Timestamp,
    ) -> Result<()> {
        Self::validate_amount(amount)?;

        match Memo::parse(memo)? {
            Memo::Stake => {
                Self::expect_token(token, TokenKind::Base, "stake")?;
                self.deposit_stake(from, amount, now)
            }
            Memo::Unliquify => {
                Self::expect_token(token, TokenKind::Liquid, "unliquify")?;
                self.unliquify(from, amount, now)
            }
            Memo::UnliquifyExact { min_output } => {
                Self::expect_token(token, TokenKind::Liquid, "unliquify_exact")?;
                self.unliquify_exact(from, amount, min_output, now)
            }
            Memo::Revenue => {
                Self::expect_token(token, TokenKind::Base, "revenue")?;
                self.add_revenue(amount)
            }
            Memo::LendingReturn => {
                Self::expect_token(token, TokenKind::Base, "lending return")?;
                self.lending_return(from, amount, now)
            }
            Memo::RentCapital {
                receiver,
                whole_tokens,
                epoch_id,
            } => {
                Self::expect_token(token, TokenKind::Base, "rent_capital")?;
                self.rent_capital(from, &receiver, whole_tokens, epoch_id, amount, now)
            }
            Memo::InstantRedeem => {
                Self::expect_token(token, TokenKind::Liquid, "instant redeem")?;
                self.require_treasury(from)?;
                self.treasury_redeem(amount, "for staking pool only", now)
            }
            Memo::Rebalance => {
                Self::expect_token(token, TokenKind::Liquid, "rebalance")?;
                self.require_treasury(from)?;
                self.treasury_redeem(amount, "rebalance", now)
            }
            Memo::Liquidity => {
                Self::expect_token(token, TokenKind::Base, "liquidity")?;
                self.require_treasury(from)?;
                self.treasury_liquidity(amount, now)
            }
        }
    }

    /// Hand the queued transfers to the host, leaving the outbox empty.
    pub fn take_outbox(&mut self) -> Vec<TokenTransfer> {
        std::mem::take(&mut self.outbox)
    }

    /// The shared call prelude: catch the window pointer up, roll the
    /// reward period if it ended, and bring the vault current.
    pub(crate) fn advance(&mut self, now: Timestamp) -> Result<()> {
        melt_epoch::sync_epoch(&self.config, &mut self.global, &mut self.epochs, now)?;

        let mut vault = self.vault()?;
        if let Some(distribution) = melt_farm::extend_period(
            &self.config,
            &mut self.global,
            &mut self.farm,
            &mut vault,
            now,
        )? {
            if distribution.treasury > 0 {
                self.outbox.push(TokenTransfer::base(
                    self.config.treasury_account.clone(),
                    distribution.treasury,
                    "treasury allocation",
                ));
            }
        }
        melt_farm::update_account(&mut self.farm, &mut vault, now)?;
        self.put_staker(vault);
        Ok(())
    }

    pub(crate) fn staker(&self, user: &str) -> Result<StakerAccount> {
        self.accounts
            .get(user)
            .cloned()
            .ok_or_else(|| CoreError::UnknownAccount(user.to_string()))
    }

    pub(crate) fn put_staker(&mut self, staker: StakerAccount) {
        self.accounts.insert(staker.id.clone(), staker);
    }

    pub(crate) fn vault(&self) -> Result<StakerAccount> {
        self.staker(&self.config.vault_account)
    }

    pub(crate) fn validate_amount(amount: TokenAmount) -> Result<()> {
        if amount == 0 || amount > MAX_TOKEN_AMOUNT {
            return Err(CoreError::InvalidAmount(amount));
        }
        Ok(())
    }

    pub(crate) fn expect_token(
        token: TokenKind,
        expected: TokenKind,
        operation: &str,
    ) -> Result<()> {
        if token != expected {
            return Err(CoreError::WrongToken {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn require_treasury(&self, from: &str) -> Result<()> {
        if from != self.config.treasury_account {
            return Err(CoreError::NotAuthorized(from.to_string()));
        }
        Ok(())
    }

    /// Burn `amount` of staked principal from circulation.
    pub(crate) fn burn_stake(&mut self, amount: TokenAmount) -> Result<()> {
        self.global.principal_earning =
            melt_math::checked::sub_u64(self.global.principal_earning, amount)?;
        self.farm.total_supply =
            melt_math::checked::sub_u128(self.farm.total_supply, u128::from(amount))?;
        Ok(())
    }

    /// Mint `amount` of staked, yield-earning principal.
    pub(crate) fn mint_stake(&mut self, amount: TokenAmount) -> Result<()> {
        self.global.principal_earning =
            melt_math::checked::add_u64(self.global.principal_earning, amount)?;
        self.farm.total_supply =
            melt_math::checked::add_u128(self.farm.total_supply, u128::from(amount))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_vault_and_first_window() {
        let config = ProtocolConfig::default();
        let p = Protocol::init(config.clone(), 120_000, 0).expect("init");

        assert!(p.accounts.contains_key(&config.vault_account));
        let first = p
            .epochs
            .get(&config.initial_epoch_start)
            .expect("first window");
        assert_eq!(first.provider, config.providers[0]);
        assert_eq!(p.global.current_provider, config.providers[0]);
        assert!(p.outbox.is_empty());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = ProtocolConfig {
            providers: Vec::new(),
            ..ProtocolConfig::default()
        };
        assert!(Protocol::init(config, 120_000, 0).is_err());
    }

    #[test]
    fn test_open_account_is_idempotent() {
        let mut p = Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init");
        p.open_account("alice", 10).expect("open");
        p.open_account("alice", 20).expect("reopen");
        assert_eq!(p.accounts.get("alice").expect("row").balance, 0);
    }

    #[test]
    fn test_deposit_rejects_wrong_token() {
        let mut p = Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init");
        assert!(matches!(
            p.handle_deposit("alice", TokenKind::Liquid, 100_000_000, "stake", 10),
            Err(CoreError::WrongToken { .. })
        ));
    }

    #[test]
    fn test_deposit_rejects_zero_and_oversized_amounts() {
        let mut p = Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init");
        assert!(matches!(
            p.handle_deposit("alice", TokenKind::Base, 0, "stake", 10),
            Err(CoreError::InvalidAmount(0))
        ));
        assert!(matches!(
            p.handle_deposit("alice", TokenKind::Base, MAX_TOKEN_AMOUNT + 1, "stake", 10),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_treasury_flows_gated_to_treasury_account() {
        let mut p = Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init");
        assert!(matches!(
            p.handle_deposit("mallory", TokenKind::Liquid, 100_000_000, "instant redeem", 10),
            Err(CoreError::NotAuthorized(_))
        ));
    }

    #[test]
    fn test_take_outbox_empties_queue() {
        let mut p = Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init");
        p.outbox
            .push(TokenTransfer::base("alice", 1, "test transfer"));
        assert_eq!(p.take_outbox().len(), 1);
        assert!(p.outbox.is_empty());
    }
}
