//! Request settlement, reservation, clawback, and expiry.

use melt_epoch::EpochStore;
use melt_math::checked;
use melt_types::{
    EpochRecord, GlobalState, ProtocolConfig, RedemptionRequest, StakerAccount, Timestamp,
    TokenAmount,
};

use crate::{RedeemError, RequestStore, Result};

/// Outcome of settling a request whose redemption window is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenWindowSettlement {
    /// Base tokens the caller owes the account.
    pub paid: TokenAmount,
    /// Whether the settled request covered the whole fill amount.
    pub covered: bool,
}

/// Outcome of an exit request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Paid immediately by settling a request in the open window.
    pub settled: TokenAmount,
    /// Reserved against live windows, to be claimed when they open.
    pub queued: TokenAmount,
    /// Paid immediately out of the lendable balance.
    pub instant: TokenAmount,
}

/// The live window keys, oldest first: previous, current, next.
fn live_windows(config: &ProtocolConfig, global: &GlobalState) -> Vec<Timestamp> {
    let mut windows = Vec::with_capacity(3);
    if global.last_epoch_start >= config.epoch_spacing_secs {
        windows.push(global.last_epoch_start - config.epoch_spacing_secs);
    }
    windows.push(global.last_epoch_start);
    windows.push(global.last_epoch_start + config.epoch_spacing_secs);
    windows
}

/// Release `amount` of a window's earmark.
fn release_earmark(epoch: &mut EpochRecord, amount: TokenAmount) -> Result<()> {
    if epoch.earmark < amount {
        return Err(RedeemError::RequestConservation {
            epoch_id: epoch.start_time,
            earmark: epoch.earmark,
            amount,
        });
    }
    epoch.earmark -= amount;
    Ok(())
}

/// Settle the account's request in the currently open redemption window,
/// if both exist.
///
/// Paying it out immediately keeps the account from tying up twice the
/// exit amount across windows. Debits the redemption pool, the window's
/// earmark, and the staked balance; deletes the request; shrinks
/// `remaining` by the settled amount unless it covered the whole fill.
pub fn settle_open_window(
    config: &ProtocolConfig,
    global: &mut GlobalState,
    epochs: &mut EpochStore,
    requests: &mut RequestStore,
    staker: &mut StakerAccount,
    remaining: &mut TokenAmount,
    now: Timestamp,
) -> Result<Option<OpenWindowSettlement>> {
    let window_end = global.last_epoch_start + config.redemption_window_secs;
    if now >= window_end || global.last_epoch_start < config.lending_duration_secs {
        return Ok(None);
    }

    // The window open now belongs to the epoch that ended as the current
    // one started.
    let claim_from = global.last_epoch_start - config.lending_duration_secs;
    let Some(epoch) = epochs.get_mut(&claim_from) else {
        return Ok(None);
    };
    let Some(request) = requests.get(&claim_from).cloned() else {
        return Ok(None);
    };

    if request.amount > staker.balance {
        return Err(RedeemError::RequestExceedsBalance {
            balance: staker.balance,
            requested: request.amount,
        });
    }
    if global.redemption_pool < request.amount {
        return Err(RedeemError::RedemptionPoolShort {
            pool: global.redemption_pool,
            requested: request.amount,
        });
    }

    let covered = request.amount >= *remaining;
    if !covered {
        *remaining = checked::sub_u64(*remaining, request.amount)?;
    }

    global.redemption_pool -= request.amount;
    release_earmark(epoch, request.amount)?;
    staker.balance = checked::sub_u64(staker.balance, request.amount)?;
    requests.remove(&claim_from);

    tracing::debug!(
        account = %staker.id,
        window = claim_from,
        paid = request.amount,
        covered,
        "open-window request settled"
    );
    Ok(Some(OpenWindowSettlement {
        paid: request.amount,
        covered,
    }))
}

/// Reserve an exit of `amount` staked tokens.
///
/// Settles the open window first, then tears down the account's standing
/// requests (only with `replace_existing`), then walks the live windows
/// oldest first reserving from each window's slack while its redemption
/// has not started. A remainder no window can absorb is paid instantly
/// out of the lendable balance.
///
/// The staked balance is debited only for the settled and instant parts;
/// queued amounts stay staked and earning until claimed.
pub fn request_exit(
    config: &ProtocolConfig,
    global: &mut GlobalState,
    epochs: &mut EpochStore,
    requests: &mut RequestStore,
    staker: &mut StakerAccount,
    amount: TokenAmount,
    replace_existing: bool,
    now: Timestamp,
) -> Result<ExitOutcome> {
    let mut remaining = amount;
    let mut outcome = ExitOutcome::default();

    if let Some(settlement) = settle_open_window(
        config,
        global,
        epochs,
        requests,
        staker,
        &mut remaining,
        now,
    )? {
        outcome.settled = settlement.paid;
        if settlement.covered {
            return Ok(outcome);
        }
    }

    if staker.balance < remaining {
        return Err(RedeemError::InsufficientStake {
            balance: staker.balance,
            requested: remaining,
        });
    }

    let windows = live_windows(config, global);

    // Standing requests would double-count against the new one.
    for key in &windows {
        let (Some(epoch), Some(request)) = (epochs.get_mut(key), requests.get(key)) else {
            continue;
        };
        if !replace_existing {
            return Err(RedeemError::ExistingRequests);
        }
        release_earmark(epoch, request.amount)?;
        requests.remove(key);
    }

    for key in &windows {
        let Some(epoch) = epochs.get_mut(key) else {
            continue;
        };
        if epoch.redemption_start <= now {
            continue;
        }
        let slack = epoch.slack();
        if slack == 0 {
            continue;
        }

        let reserved = slack.min(remaining);
        epoch.earmark = checked::add_u64(epoch.earmark, reserved)?;
        requests.insert(
            *key,
            RedemptionRequest {
                epoch_id: *key,
                amount: reserved,
            },
        );
        outcome.queued = checked::add_u64(outcome.queued, reserved)?;
        remaining -= reserved;
        if remaining == 0 {
            break;
        }
    }

    if remaining > 0 {
        // Capital not committed to windows can only be in the lendable
        // bucket; a shortfall here means the books are off.
        if global.available_for_lending < remaining {
            return Err(RedeemError::QueueExhausted {
                remaining,
                lendable: global.available_for_lending,
            });
        }
        global.available_for_lending -= remaining;
        staker.balance = checked::sub_u64(staker.balance, remaining)?;
        outcome.instant = remaining;
    }

    tracing::debug!(
        account = %staker.id,
        amount,
        settled = outcome.settled,
        queued = outcome.queued,
        instant = outcome.instant,
        "exit requested"
    );
    Ok(outcome)
}

/// Shrink the account's standing requests down to `new_balance`.
///
/// Runs after any operation that reduces a staked balance. Requests are
/// clawed back newest window first, so what survives is the reservation
/// the account will be able to claim soonest. Returns the amount removed.
pub fn debit_if_overdrawn(
    config: &ProtocolConfig,
    global: &GlobalState,
    epochs: &mut EpochStore,
    requests: &mut RequestStore,
    new_balance: TokenAmount,
) -> Result<TokenAmount> {
    let mut pending: Vec<Timestamp> = Vec::with_capacity(3);
    let mut total: TokenAmount = 0;
    for key in live_windows(config, global).into_iter().rev() {
        if let (Some(_), Some(request)) = (epochs.get(&key), requests.get(&key)) {
            pending.push(key);
            total = checked::add_u64(total, request.amount)?;
        }
    }

    if total <= new_balance {
        return Ok(0);
    }
    let mut overdraft = total - new_balance;
    let removed = overdraft;

    for key in pending {
        let (Some(epoch), Some(request)) = (epochs.get_mut(&key), requests.get_mut(&key)) else {
            continue;
        };

        if request.amount > overdraft {
            request.amount -= overdraft;
            release_earmark(epoch, overdraft)?;
            overdraft = 0;
        } else {
            overdraft -= request.amount;
            release_earmark(epoch, request.amount)?;
            requests.remove(&key);
        }
        if overdraft == 0 {
            break;
        }
    }

    tracing::debug!(new_balance, removed, "overdrawn requests clawed back");
    Ok(removed)
}

/// Drop the account's requests against windows older than the previous
/// live one. Their redemption periods have long closed; the backing
/// capital was restaked by expiry reallocation.
pub fn clear_expired(
    config: &ProtocolConfig,
    global: &GlobalState,
    requests: &mut RequestStore,
) -> Result<usize> {
    if requests.is_empty() {
        return Err(RedeemError::NothingToClear);
    }
    let cutoff = global.last_epoch_start.saturating_sub(config.epoch_spacing_secs);
    let before = requests.len();
    requests.retain(|key, _| *key >= cutoff);
    Ok(before - requests.len())
}
