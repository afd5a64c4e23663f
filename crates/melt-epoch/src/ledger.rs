//! Window advancement, rental pricing, and return booking.

use std::collections::BTreeMap;

use melt_math::checked;
use melt_types::{
    EpochRecord, GlobalState, ProtocolConfig, Timestamp, TokenAmount, SECONDS_PER_DAY,
    UNWIND_GRACE_SECS,
};

use crate::{EpochError, ProviderRing, Result};

/// Window records keyed by start time.
pub type EpochStore = BTreeMap<Timestamp, EpochRecord>;

/// Catch the window pointer up to `now`.
///
/// Advances one spacing at a time, rotating the provider and lazily
/// creating the record for each newly opened window. A quiet stretch longer
/// than one spacing is caught up in a loop so no window is ever skipped.
pub fn sync_epoch(
    config: &ProtocolConfig,
    global: &mut GlobalState,
    epochs: &mut EpochStore,
    now: Timestamp,
) -> Result<()> {
    let ring = ProviderRing::new(&config.providers);
    let mut next_start = global.last_epoch_start + config.epoch_spacing_secs;

    while now >= next_start {
        let next_provider = ring.next_after(&global.current_provider)?.clone();

        global.last_epoch_start = next_start;
        global.current_provider = next_provider.clone();

        epochs.entry(next_start).or_insert_with(|| {
            tracing::debug!(start = next_start, provider = %next_provider, "window opened");
            EpochRecord::create(
                next_start,
                next_provider.clone(),
                0,
                config.lending_duration_secs,
                config.redemption_window_secs,
            )
        });

        next_start += config.epoch_spacing_secs;
    }
    Ok(())
}

/// Seconds of lending a rental against `epoch_id` buys at `now`.
///
/// Three windows are live at any time. The newest (not yet opened) window
/// rents only within the configured lead time before it opens; the current
/// window rents until its unwind deadline; the previous window rents only
/// during the short grace after the current one opened, with the term
/// clamped up to a one-day minimum.
pub fn rental_term_secs(
    config: &ProtocolConfig,
    global: &GlobalState,
    epoch_id: Timestamp,
    now: Timestamp,
) -> Result<u64> {
    let not_rentable = EpochError::WindowNotRentable { epoch_id, now };

    let into_current = checked::sub_u64(now, global.last_epoch_start)?;
    let lendable = checked::sub_u64(config.lending_duration_secs, UNWIND_GRACE_SECS)?;
    let spacing = config.epoch_spacing_secs;

    if epoch_id == global.last_epoch_start + spacing {
        // Not open yet; rentable only close to its start.
        if into_current + config.next_window_rent_lead_secs < spacing {
            return Err(not_rentable);
        }
        Ok(spacing + lendable - into_current)
    } else if epoch_id == global.last_epoch_start {
        if into_current >= lendable {
            return Err(not_rentable);
        }
        Ok(lendable - into_current)
    } else if spacing <= global.last_epoch_start && epoch_id == global.last_epoch_start - spacing {
        let grace = checked::sub_u64(lendable, spacing)?;
        if into_current >= grace {
            return Err(not_rentable);
        }
        // Payment covers at least one full day even for a shorter tail.
        Ok((grace - into_current).max(SECONDS_PER_DAY))
    } else {
        Err(not_rentable)
    }
}

/// Book `amount` of returned lending capital against `epoch`.
///
/// The window's unfilled earmark is topped up into the redemption pool
/// first; whatever remains goes back to the lendable balance.
pub fn apply_lending_return(
    global: &mut GlobalState,
    epoch: &mut EpochRecord,
    amount: TokenAmount,
) -> Result<()> {
    let unfilled = epoch.earmark.saturating_sub(epoch.total_added_to_redemption);
    let to_redemption = unfilled.min(amount);
    let to_lendable = amount - to_redemption;

    epoch.total_added_to_redemption =
        checked::add_u64(epoch.total_added_to_redemption, to_redemption)?;
    epoch.total_returned = checked::add_u64(epoch.total_returned, amount)?;
    global.redemption_pool = checked::add_u64(global.redemption_pool, to_redemption)?;
    global.available_for_lending = checked::add_u64(global.available_for_lending, to_lendable)?;

    tracing::debug!(
        window = epoch.start_time,
        amount,
        to_redemption,
        to_lendable,
        "lending return booked"
    );
    Ok(())
}

/// Find the newest window at or below `newest` lent to `provider`.
///
/// # Errors
///
/// - [`EpochError::UnknownWindow`] if no record exists at `newest`
/// - [`EpochError::NoWindowForProvider`] if no window back from there
///   belongs to `provider`
pub fn window_for_provider<'a>(
    epochs: &'a mut EpochStore,
    newest: Timestamp,
    provider: &str,
) -> Result<&'a mut EpochRecord> {
    if !epochs.contains_key(&newest) {
        return Err(EpochError::UnknownWindow(newest));
    }
    let key = epochs
        .range(..=newest)
        .rev()
        .find(|(_, e)| e.provider == provider)
        .map(|(k, _)| *k)
        .ok_or_else(|| EpochError::NoWindowForProvider(provider.to_string()))?;

    epochs
        .get_mut(&key)
        .ok_or(EpochError::UnknownWindow(newest))
}
