//! Redemption requests.

use serde::{Deserialize, Serialize};

use crate::{TokenAmount, Timestamp};

/// One account's exit request against a specific lending window.
///
/// Keyed by `(account, epoch_id)` in the request store. Created when an exit
/// cannot be filled immediately; deleted when paid out, claimed back, or
/// clawed back on overdraft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    /// Start time of the epoch the request is reserved against.
    pub epoch_id: Timestamp,
    /// Requested token amount.
    pub amount: TokenAmount,
}
