//! Round-robin provider rotation.

use melt_types::AccountId;

use crate::{EpochError, Result};

/// A view over the configured provider ring.
pub struct ProviderRing<'a> {
    providers: &'a [AccountId],
}

impl<'a> ProviderRing<'a> {
    /// Wrap the configured providers. Validity (non-empty, duplicate-free)
    /// is the configuration's responsibility.
    pub fn new(providers: &'a [AccountId]) -> Self {
        Self { providers }
    }

    /// The provider after `current` in ring order.
    ///
    /// # Errors
    ///
    /// [`EpochError::ProviderRotation`] if `current` is not in the ring or
    /// the ring would hand back the same provider.
    pub fn next_after(&self, current: &str) -> Result<&'a AccountId> {
        let idx = self
            .providers
            .iter()
            .position(|p| p == current)
            .ok_or_else(|| {
                EpochError::ProviderRotation(format!("{current} is not a known provider"))
            })?;

        let next = &self.providers[(idx + 1) % self.providers.len()];
        if next == current {
            return Err(EpochError::ProviderRotation(format!(
                "ring of one cannot rotate past {current}"
            )));
        }
        Ok(next)
    }
}
