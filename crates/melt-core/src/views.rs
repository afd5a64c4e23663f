//! Read-only views. Nothing here mutates the committed state; projections
//! run against working copies.

use melt_types::{RedemptionRequest, Timestamp, TokenAmount};

use crate::{Protocol, Result};

impl Protocol {
    /// What [`claim_yield`](Self::claim_yield) would pay `user` at `now`,
    /// including a period rollover that has not been applied yet.
    pub fn claimable_yield(&self, user: &str, now: Timestamp) -> Result<TokenAmount> {
        let staker = self.staker(user)?;

        let mut global = self.global.clone();
        let mut farm = self.farm.clone();
        let mut vault = self.vault()?;
        let _ = melt_farm::extend_period(&self.config, &mut global, &mut farm, &mut vault, now)?;

        Ok(melt_farm::projected_claimable(&farm, &staker, now)?)
    }

    /// Whether `user` has any standing redemption request.
    pub fn has_pending_request(&self, user: &str) -> bool {
        self.requests.get(user).is_some_and(|store| !store.is_empty())
    }

    /// The user's standing redemption requests, oldest window first.
    pub fn pending_requests(&self, user: &str) -> Vec<RedemptionRequest> {
        self.requests
            .get(user)
            .map(|store| store.values().cloned().collect())
            .unwrap_or_default()
    }
}
