//! Lending-window records.

use serde::{Deserialize, Serialize};

use crate::{AccountId, TokenAmount, Timestamp, UNWIND_GRACE_SECS};

/// One lending window, keyed by its start time.
///
/// Invariant: `earmark <= bucket` at all times. Records are created lazily
/// the first time capital touches a window and are never deleted by normal
/// operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Window start time, also the record key.
    pub start_time: Timestamp,
    /// Time after which the window's lending must be unwound.
    pub unwind_deadline: Timestamp,
    /// Provider the window lent to.
    pub provider: AccountId,
    /// Capital committed to lending in this window.
    pub bucket: TokenAmount,
    /// Portion of the bucket reserved for redemption payout.
    pub earmark: TokenAmount,
    /// Start of this window's redemption period.
    pub redemption_start: Timestamp,
    /// End of this window's redemption period.
    pub redemption_end: Timestamp,
    /// Cumulative principal returned from lending.
    pub total_returned: TokenAmount,
    /// Cumulative amount moved into the redemption pool for this window.
    pub total_added_to_redemption: TokenAmount,
}

impl EpochRecord {
    /// Create the record for the window starting at `start_time`.
    ///
    /// The unwind deadline sits three days before the window's end so
    /// returned capital can reach the redemption pool in time.
    pub fn create(
        start_time: Timestamp,
        provider: AccountId,
        bucket: TokenAmount,
        lending_duration_secs: u64,
        redemption_window_secs: u64,
    ) -> Self {
        Self {
            start_time,
            unwind_deadline: start_time + lending_duration_secs - UNWIND_GRACE_SECS,
            provider,
            bucket,
            earmark: 0,
            redemption_start: start_time + lending_duration_secs,
            redemption_end: start_time + lending_duration_secs + redemption_window_secs,
            total_returned: 0,
            total_added_to_redemption: 0,
        }
    }

    /// Unreserved portion of the bucket available to back new exit requests.
    pub fn slack(&self) -> TokenAmount {
        self.bucket.saturating_sub(self.earmark)
    }
}
