//! Period rollover and revenue distribution.

use melt_math::{asset_share, checked, mul_div_wide, SCALE_1E8};
use melt_types::{GlobalState, ProtocolConfig, RewardFarm, StakerAccount, Timestamp, TokenAmount};

use crate::{accrual, FarmError, Result};

/// One distribution's share allocations. The treasury share is the
/// caller's to pay out; everything else is already booked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    /// Revenue distributed in total.
    pub total: TokenAmount,
    /// Share dripped to stakers over the new period.
    pub user: TokenAmount,
    /// Share owed to the treasury.
    pub treasury: TokenAmount,
    /// Share minted as new staked principal for the ecosystem fund.
    pub ecosystem: TokenAmount,
    /// Liquid units minted against the ecosystem principal.
    pub ecosystem_liquid: TokenAmount,
}

/// Roll the farm into a new reward period once the current one has ended.
///
/// No-op while the period is still running. With zero pending revenue the
/// farm skips forward by whole elapsed periods at a zero rate and nothing
/// is distributed. Otherwise pending revenue is split by the configured
/// shares; the user share funds the new drip rate, the ecosystem share is
/// minted into the vault as staked principal with matching liquid units,
/// and the treasury share is returned for the caller to pay out.
///
/// # Errors
///
/// [`FarmError::OverallocatedDistribution`] if the share split sums past
/// the distributed total.
pub fn extend_period(
    config: &ProtocolConfig,
    global: &mut GlobalState,
    farm: &mut RewardFarm,
    vault: &mut StakerAccount,
    now: Timestamp,
) -> Result<Option<Distribution>> {
    if now <= farm.period_finish {
        return Ok(None);
    }

    if global.pending_revenue == 0 {
        zero_distribution(farm, now)?;
        return Ok(None);
    }

    let total = global.pending_revenue;
    let mut user = asset_share(total, config.user_share_1e6)?;
    let treasury = asset_share(total, config.treasury_share_1e6)?;
    let ecosystem = asset_share(total, config.ecosystem_share_1e6)?;

    // Priced at the pre-mint ratio.
    let ecosystem_liquid = melt_ratio::to_liquid(
        global.principal_backing_liquid,
        global.liquid_supply,
        ecosystem,
    )?;

    // Rounding dust goes to the stakers.
    let allocated = checked::add_u64(checked::add_u64(user, treasury)?, ecosystem)?;
    if allocated > total {
        return Err(FarmError::OverallocatedDistribution { allocated, total });
    }
    user = checked::add_u64(user, total - allocated)?;

    global.total_revenue_distributed = checked::add_u64(global.total_revenue_distributed, total)?;
    global.available_for_lending = checked::add_u64(global.available_for_lending, ecosystem)?;
    global.ecosystem_fund_liquid =
        checked::add_u64(global.ecosystem_fund_liquid, ecosystem_liquid)?;
    global.principal_backing_liquid =
        checked::add_u64(global.principal_backing_liquid, ecosystem)?;
    global.liquid_supply = checked::add_u64(global.liquid_supply, ecosystem_liquid)?;
    global.pending_revenue = 0;

    close_out(farm)?;
    skip_forward(farm, now);
    farm.reward_rate = mul_div_wide(
        u128::from(user),
        SCALE_1E8,
        u128::from(farm.rewards_duration),
    )?;
    farm.reward_pool = checked::add_u64(farm.reward_pool, user)?;

    // Bring the vault current before its balance grows by the mint.
    accrual::update_account(farm, vault, now)?;
    farm.total_supply = checked::add_u128(farm.total_supply, u128::from(ecosystem))?;
    vault.balance = checked::add_u64(vault.balance, ecosystem)?;

    tracing::debug!(
        total,
        user,
        treasury,
        ecosystem,
        ecosystem_liquid,
        period_finish = farm.period_finish,
        "reward period extended"
    );

    Ok(Some(Distribution {
        total,
        user,
        treasury,
        ecosystem,
        ecosystem_liquid,
    }))
}

/// Close out the running accumulator at the period end.
fn close_out(farm: &mut RewardFarm) -> Result<()> {
    if farm.last_update_time < farm.period_finish {
        farm.reward_per_token_stored = accrual::reward_per_token(farm, farm.period_finish)?;
        farm.last_update_time = farm.period_finish;
    }
    Ok(())
}

/// Advance the farm by the whole periods elapsed since `period_finish`,
/// never a fractional one, at a zero reward rate.
fn zero_distribution(farm: &mut RewardFarm, now: Timestamp) -> Result<()> {
    close_out(farm)?;
    skip_forward(farm, now);
    farm.reward_rate = 0;
    tracing::debug!(
        period_finish = farm.period_finish,
        "reward period extended with nothing to distribute"
    );
    Ok(())
}

fn skip_forward(farm: &mut RewardFarm, now: Timestamp) {
    let elapsed = now.saturating_sub(farm.period_finish) / farm.rewards_duration;
    farm.last_update_time += farm.rewards_duration * elapsed;
    farm.period_finish = farm.last_update_time + farm.rewards_duration;
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn setup() -> (ProtocolConfig, GlobalState, RewardFarm, StakerAccount) {
        let config = ProtocolConfig::default();
        let global = GlobalState::new(0, "lender.one".to_string(), 120_000, DAY);
        let farm = RewardFarm::new(0, DAY);
        let vault = StakerAccount::open("vault".to_string(), 0);
        (config, global, farm, vault)
    }

    #[test]
    fn test_noop_while_period_running() {
        let (config, mut global, mut farm, mut vault) = setup();
        global.pending_revenue = 1_000;
        let out = extend_period(&config, &mut global, &mut farm, &mut vault, DAY)
            .expect("extend");
        assert!(out.is_none());
        assert_eq!(global.pending_revenue, 1_000);
    }

    #[test]
    fn test_zero_revenue_skips_whole_periods() {
        let (config, mut global, mut farm, mut vault) = setup();
        // 3.5 days past the first finish: skip 3 whole periods
        let now = DAY + 3 * DAY + DAY / 2;
        let out = extend_period(&config, &mut global, &mut farm, &mut vault, now)
            .expect("extend");
        assert!(out.is_none());
        assert_eq!(farm.last_update_time, 4 * DAY);
        assert_eq!(farm.period_finish, 5 * DAY);
        assert_eq!(farm.reward_rate, 0);
    }

    #[test]
    fn test_distribution_splits_and_books() {
        let (config, mut global, mut farm, mut vault) = setup();
        global.pending_revenue = 100_000_000; // 1 token
        let out = extend_period(&config, &mut global, &mut farm, &mut vault, DAY + 1)
            .expect("extend")
            .expect("distribution");

        assert_eq!(out.total, 100_000_000);
        assert_eq!(out.user, 85_000_000);
        assert_eq!(out.treasury, 7_000_000);
        assert_eq!(out.ecosystem, 8_000_000);
        // bootstrap ratio is 1:1
        assert_eq!(out.ecosystem_liquid, 8_000_000);

        assert_eq!(global.pending_revenue, 0);
        assert_eq!(global.total_revenue_distributed, 100_000_000);
        assert_eq!(global.available_for_lending, 8_000_000);
        assert_eq!(global.principal_backing_liquid, 8_000_000);
        assert_eq!(global.liquid_supply, 8_000_000);
        assert_eq!(global.ecosystem_fund_liquid, 8_000_000);

        assert_eq!(farm.reward_pool, 85_000_000);
        assert_eq!(
            farm.reward_rate,
            u128::from(out.user) * SCALE_1E8 / u128::from(DAY)
        );
        assert_eq!(farm.total_supply, u128::from(out.ecosystem));
        assert_eq!(vault.balance, out.ecosystem);
    }

    #[test]
    fn test_rounding_dust_goes_to_user_share() {
        let (config, mut global, mut farm, mut vault) = setup();
        global.pending_revenue = 101; // splits: 85 / 7 / 8, dust 1
        let out = extend_period(&config, &mut global, &mut farm, &mut vault, DAY + 1)
            .expect("extend")
            .expect("distribution");
        assert_eq!(out.user + out.treasury + out.ecosystem, out.total);
        assert_eq!(out.user, 86);
    }

    #[test]
    fn test_full_drip_never_exceeds_pool() {
        let (config, mut global, mut farm, mut vault) = setup();
        global.pending_revenue = 123_456_789;
        extend_period(&config, &mut global, &mut farm, &mut vault, DAY + 1)
            .expect("extend")
            .expect("distribution");

        // drip the whole next period into the sole staker (the vault)
        let finish = farm.period_finish;
        accrual::update_account(&mut farm, &mut vault, finish).expect("update");
        assert!(vault.claimable <= farm.reward_pool);
        assert!(farm.total_paid_out <= farm.reward_pool);
    }

    #[test]
    fn test_back_to_back_distributions_accumulate_pool() {
        let (config, mut global, mut farm, mut vault) = setup();
        global.pending_revenue = 1_000_000;
        extend_period(&config, &mut global, &mut farm, &mut vault, DAY + 1)
            .expect("first");
        let pool_after_first = farm.reward_pool;

        global.pending_revenue = 2_000_000;
        let now = farm.period_finish + 1;
        extend_period(&config, &mut global, &mut farm, &mut vault, now).expect("second");
        assert!(farm.reward_pool > pool_after_first);
        assert_eq!(global.pending_revenue, 0);
    }

    #[test]
    fn test_accumulator_closed_out_before_new_rate() {
        let (config, mut global, mut farm, mut vault) = setup();
        farm.reward_rate = 5 * SCALE_1E8;
        farm.reward_pool = 5 * DAY;
        farm.total_supply = u128::from(10u64);
        global.pending_revenue = 1_000_000;

        extend_period(&config, &mut global, &mut farm, &mut vault, DAY + 100)
            .expect("extend");
        // the old rate's full-period accrual is locked in
        let old_accrual = 5 * SCALE_1E8 * u128::from(DAY) * SCALE_1E8 / 10;
        assert!(farm.reward_per_token_stored >= old_accrual);
    }
}
