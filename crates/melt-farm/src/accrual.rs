//! Accumulator math and per-account accrual.

use melt_math::{checked, mul_div_wide, SCALE_1E16, SCALE_1E8};
use melt_types::{RewardFarm, StakerAccount, Timestamp, TokenAmount, WideAmount};

use crate::Result;

/// Current value of the reward-per-token accumulator at `now`.
///
/// With nothing staked the accumulator holds still; otherwise it advances
/// by `rate * elapsed * 1e8 / total_supply`, where elapsed time is clipped
/// to the active period.
pub fn reward_per_token(farm: &RewardFarm, now: Timestamp) -> Result<WideAmount> {
    if farm.total_supply == 0 {
        return Ok(farm.reward_per_token_stored);
    }

    let clip_end = now.min(farm.period_finish);
    let clip_start = farm.period_start.max(farm.last_update_time);
    let elapsed = clip_end.saturating_sub(clip_start);

    let accrued = mul_div_wide(
        farm.reward_rate,
        WideAmount::from(elapsed) * SCALE_1E8,
        farm.total_supply,
    )?;
    Ok(checked::add_u128(farm.reward_per_token_stored, accrued)?)
}

/// Yield the account has earned since its accumulator snapshot, priced at
/// `per_token` (1e16-scaled).
pub fn earned(account: &StakerAccount, per_token: WideAmount) -> Result<TokenAmount> {
    let delta = checked::sub_u128(per_token, account.paid_per_token)?;
    let raw = mul_div_wide(WideAmount::from(account.balance), delta, SCALE_1E16)?;
    Ok(checked::narrow(raw)?)
}

/// Bring `account` current with the farm at `now`.
///
/// Refreshes the global accumulator, credits the account's accrued yield
/// into `claimable`, and refreshes the account's snapshot. Must run before
/// any balance change on the account.
///
/// # Errors
///
/// [`FarmError::OverdrawnRewardPool`](crate::FarmError::OverdrawnRewardPool)
/// if the credit would push cumulative payouts past cumulative funding.
pub fn update_account(
    farm: &mut RewardFarm,
    account: &mut StakerAccount,
    now: Timestamp,
) -> Result<()> {
    if farm.last_update_time < farm.period_finish && now > farm.period_start {
        farm.reward_per_token_stored = reward_per_token(farm, now)?;
    }
    farm.last_update_time = now;

    if account.balance > 0 && now > farm.period_start {
        let pending = earned(account, farm.reward_per_token_stored)?;
        account.claimable = checked::add_u64(account.claimable, pending)?;
        farm.total_paid_out = checked::add_u64(farm.total_paid_out, pending)?;

        if farm.total_paid_out > farm.reward_pool {
            return Err(crate::FarmError::OverdrawnRewardPool {
                paid_out: farm.total_paid_out,
                funded: farm.reward_pool,
            });
        }
    }

    account.paid_per_token = farm.reward_per_token_stored;
    account.last_update = now;
    Ok(())
}

/// What `claimable` would hold after [`update_account`] at `now`, without
/// mutating anything. Backs the read-only yield view.
pub fn projected_claimable(
    farm: &RewardFarm,
    account: &StakerAccount,
    now: Timestamp,
) -> Result<TokenAmount> {
    let per_token = if farm.last_update_time < farm.period_finish && now > farm.period_start {
        reward_per_token(farm, now)?
    } else {
        farm.reward_per_token_stored
    };

    if account.balance > 0 && now > farm.period_start {
        let pending = earned(account, per_token)?;
        return Ok(checked::add_u64(account.claimable, pending)?);
    }
    Ok(account.claimable)
}
