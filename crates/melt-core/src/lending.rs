//! Lending flows: revenue intake, capital rental, commits, and returns.

use melt_epoch::ProviderRing;
use melt_math::{checked, mul_div};
use melt_types::{
    EpochRecord, Timestamp, TokenAmount, TokenTransfer, SECONDS_PER_DAY, UNITS_PER_TOKEN,
};

use crate::{CoreError, Protocol, Result};

/// Smallest rental size in whole tokens.
pub const MIN_RENT_WHOLE_TOKENS: u64 = 10;

/// Largest rental size in whole tokens.
pub const MAX_RENT_WHOLE_TOKENS: u64 = 10_000_000;

impl Protocol {
    /// Credit a revenue deposit to the pending bucket.
    ///
    /// Deliberately does not run the call prelude: revenue arriving after
    /// a period ended still belongs to the next distribution, never to
    /// the one being rolled.
    pub fn add_revenue(&mut self, amount: TokenAmount) -> Result<()> {
        Self::validate_amount(amount)?;
        self.global.pending_revenue = checked::add_u64(self.global.pending_revenue, amount)?;
        tracing::debug!(amount, pending = self.global.pending_revenue, "revenue received");
        Ok(())
    }

    /// Book a provider returning lent capital.
    ///
    /// Applies to the newest live window lent to `provider`; its unfilled
    /// earmark fills the redemption pool first, the rest goes back to the
    /// lendable balance.
    pub fn lending_return(
        &mut self,
        provider: &str,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<()> {
        self.advance(now)?;
        if !self.config.is_provider(provider) {
            return Err(CoreError::NotAProvider(provider.to_string()));
        }

        let newest = self.global.last_epoch_start;
        let epoch = melt_epoch::window_for_provider(&mut self.epochs, newest, provider)?;
        melt_epoch::apply_lending_return(&mut self.global, epoch, amount)?;
        Ok(())
    }

    /// Rent `whole_tokens` of lending capital against `epoch_id`.
    ///
    /// The payment must cover `rent_cost_per_unit_day` per whole token for
    /// the window's remaining term; any overpayment is refunded. The
    /// rented capital moves from the lendable balance into the window's
    /// bucket and is delegated to `receiver` through the window's
    /// provider.
    pub fn rent_capital(
        &mut self,
        renter: &str,
        receiver: &str,
        whole_tokens: u64,
        epoch_id: Timestamp,
        payment: TokenAmount,
        now: Timestamp,
    ) -> Result<()> {
        self.advance(now)?;
        if !(MIN_RENT_WHOLE_TOKENS..=MAX_RENT_WHOLE_TOKENS).contains(&whole_tokens) {
            return Err(CoreError::RentBounds {
                whole_tokens,
                min: MIN_RENT_WHOLE_TOKENS,
                max: MAX_RENT_WHOLE_TOKENS,
            });
        }

        let term = melt_epoch::rental_term_secs(&self.config, &self.global, epoch_id, now)?;
        let required = mul_div(
            checked::mul_u64(self.global.rent_cost_per_unit_day, whole_tokens)?,
            term,
            u128::from(SECONDS_PER_DAY),
        )?;
        if payment < required {
            return Err(CoreError::RentUnderpaid {
                required,
                paid: payment,
            });
        }

        let amount = checked::mul_u64(whole_tokens, UNITS_PER_TOKEN)?;
        if self.global.available_for_lending < amount {
            return Err(CoreError::InsufficientLendable {
                lendable: self.global.available_for_lending,
                requested: amount,
            });
        }

        // Only the not-yet-opened window can be missing its record.
        self.ensure_window(epoch_id)?;
        let epoch = self
            .epochs
            .get_mut(&epoch_id)
            .ok_or(melt_epoch::EpochError::UnknownWindow(epoch_id))?;
        epoch.bucket = checked::add_u64(epoch.bucket, amount)?;
        let provider = epoch.provider.clone();

        self.global.available_for_lending -= amount;
        self.global.pending_revenue = checked::add_u64(self.global.pending_revenue, required)?;

        self.outbox.push(TokenTransfer::base(
            provider,
            amount,
            format!("|lend|{receiver}|{epoch_id}|"),
        ));
        let refund = payment - required;
        if refund > 0 {
            self.outbox
                .push(TokenTransfer::base(renter, refund, "rent refund"));
        }

        tracing::debug!(
            renter,
            receiver,
            whole_tokens,
            window = epoch_id,
            term,
            required,
            refund,
            "capital rented"
        );
        Ok(())
    }

    /// Commit the whole lendable balance to the next window.
    pub fn commit_to_lending(&mut self, now: Timestamp) -> Result<()> {
        self.advance(now)?;
        if now < self.global.next_commit_time {
            return Err(CoreError::CommitTooSoon {
                next_commit_time: self.global.next_commit_time,
            });
        }
        let amount = self.global.available_for_lending;
        if amount == 0 {
            return Err(CoreError::NothingToCommit);
        }

        let next_window = self.global.last_epoch_start + self.config.epoch_spacing_secs;
        self.ensure_window(next_window)?;
        let epoch = self
            .epochs
            .get_mut(&next_window)
            .ok_or(melt_epoch::EpochError::UnknownWindow(next_window))?;
        epoch.bucket = checked::add_u64(epoch.bucket, amount)?;
        let provider = epoch.provider.clone();

        self.global.available_for_lending = 0;
        self.global.next_commit_time = now + self.config.commit_interval_secs;

        let fallback = self.config.fallback_receiver.clone();
        self.outbox.push(TokenTransfer::base(
            provider,
            amount,
            format!("|lend|{fallback}|{next_window}|"),
        ));

        tracing::debug!(amount, window = next_window, "lendable balance committed");
        Ok(())
    }

    /// Return the unclaimed redemption pool to the lendable balance once
    /// the open window has closed.
    pub fn reallocate_expired(&mut self, now: Timestamp) -> Result<()> {
        self.advance(now)?;
        let ends = self.global.last_epoch_start + self.config.redemption_window_secs;
        if now <= ends {
            return Err(CoreError::RedemptionStillOpen { ends });
        }
        let pool = self.global.redemption_pool;
        if pool == 0 {
            return Err(CoreError::NothingToReallocate);
        }

        self.global.redemption_pool = 0;
        self.global.available_for_lending =
            checked::add_u64(self.global.available_for_lending, pool)?;

        tracing::debug!(pool, "unclaimed redemption pool reallocated");
        Ok(())
    }

    /// Create the record for `epoch_id` if it does not exist yet. Windows
    /// past the pointer belong to the next provider in the ring.
    fn ensure_window(&mut self, epoch_id: Timestamp) -> Result<()> {
        if self.epochs.contains_key(&epoch_id) {
            return Ok(());
        }
        let ring = ProviderRing::new(&self.config.providers);
        let provider = ring.next_after(&self.global.current_provider)?.clone();
        self.epochs.insert(
            epoch_id,
            EpochRecord::create(
                epoch_id,
                provider,
                0,
                self.config.lending_duration_secs,
                self.config.redemption_window_secs,
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melt_types::{days_to_seconds, ProtocolConfig, TokenKind};

    fn protocol() -> Protocol {
        Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init")
    }

    fn stake(p: &mut Protocol, user: &str, tokens: u64, now: u64) {
        p.deposit_stake(user, tokens * UNITS_PER_TOKEN, now)
            .expect("stake");
    }

    #[test]
    fn test_revenue_accumulates_pending() {
        let mut p = protocol();
        p.handle_deposit("partner", TokenKind::Base, 500, "revenue", 10)
            .expect("revenue");
        p.handle_deposit("partner", TokenKind::Base, 250, "revenue", 20)
            .expect("revenue");
        assert_eq!(p.global.pending_revenue, 750);
    }

    #[test]
    fn test_commit_moves_lendable_into_next_window() {
        let mut p = protocol();
        stake(&mut p, "alice", 1_000, 10);

        p.commit_to_lending(days_to_seconds(2)).expect("commit");

        assert_eq!(p.global.available_for_lending, 0);
        let window = p.global.last_epoch_start + p.config.epoch_spacing_secs;
        let epoch = p.epochs.get(&window).expect("window");
        assert_eq!(epoch.bucket, 1_000 * UNITS_PER_TOKEN);
        // window 0 went to the first provider, so the next one takes this
        assert_eq!(epoch.provider, "lender.two");
        let sent = p.outbox.last().expect("transfer");
        assert_eq!(sent.to, "lender.two");
        assert_eq!(sent.amount, 1_000 * UNITS_PER_TOKEN);
    }

    #[test]
    fn test_commit_respects_interval() {
        let mut p = protocol();
        stake(&mut p, "alice", 1_000, 10);
        p.commit_to_lending(days_to_seconds(2)).expect("commit");
        stake(&mut p, "alice", 100, days_to_seconds(2) + 5);

        assert!(matches!(
            p.commit_to_lending(days_to_seconds(2) + 10),
            Err(CoreError::CommitTooSoon { .. })
        ));
        p.commit_to_lending(days_to_seconds(3) + 10).expect("commit");
    }

    #[test]
    fn test_commit_with_empty_bucket_rejected() {
        let mut p = protocol();
        assert!(matches!(
            p.commit_to_lending(days_to_seconds(2)),
            Err(CoreError::NothingToCommit)
        ));
    }

    #[test]
    fn test_lending_return_requires_provider() {
        let mut p = protocol();
        stake(&mut p, "alice", 1_000, 10);
        assert!(matches!(
            p.lending_return("mallory", 100, 20),
            Err(CoreError::NotAProvider(_))
        ));
    }

    #[test]
    fn test_lending_return_fills_earmark_first() {
        let mut p = protocol();
        stake(&mut p, "alice", 1_000, 10);
        p.commit_to_lending(days_to_seconds(4)).expect("commit");
        p.request_exit("alice", 300 * UNITS_PER_TOKEN, false, days_to_seconds(4) + 5)
            .expect("exit");

        let window = p.global.last_epoch_start + p.config.epoch_spacing_secs;
        p.handle_deposit(
            "lender.two",
            TokenKind::Base,
            1_000 * UNITS_PER_TOKEN,
            "lending return",
            window + days_to_seconds(8),
        )
        .expect("return");

        assert_eq!(p.global.redemption_pool, 300 * UNITS_PER_TOKEN);
        assert_eq!(p.global.available_for_lending, 700 * UNITS_PER_TOKEN);
        let epoch = p.epochs.get(&window).expect("window");
        assert_eq!(epoch.total_returned, 1_000 * UNITS_PER_TOKEN);
        assert_eq!(epoch.total_added_to_redemption, 300 * UNITS_PER_TOKEN);
    }

    #[test]
    fn test_rent_capital_prices_by_term() {
        let mut p = protocol();
        stake(&mut p, "alice", 2_000, 10);

        // renting the current window right at its start buys the full
        // 11-day lendable term
        let cost = 120_000u64 * 1_000 * 11;
        p.handle_deposit(
            "renter",
            TokenKind::Base,
            cost,
            "|rent_capital|worker.acct|1000|0|",
            60,
        )
        .expect("rent");

        let epoch = p.epochs.get(&0).expect("window");
        assert_eq!(epoch.bucket, 1_000 * UNITS_PER_TOKEN);
        assert_eq!(p.global.available_for_lending, 1_000 * UNITS_PER_TOKEN);
        assert!(p.global.pending_revenue > 0);
        let sent = p
            .outbox
            .iter()
            .find(|t| t.to == "lender.one")
            .expect("delegation");
        assert_eq!(sent.amount, 1_000 * UNITS_PER_TOKEN);
        assert!(sent.memo.contains("worker.acct"));
    }

    #[test]
    fn test_rent_capital_underpayment_rejected() {
        let mut p = protocol();
        stake(&mut p, "alice", 2_000, 10);
        assert!(matches!(
            p.handle_deposit(
                "renter",
                TokenKind::Base,
                1,
                "|rent_capital|worker.acct|1000|0|",
                60,
            ),
            Err(CoreError::RentUnderpaid { .. })
        ));
    }

    #[test]
    fn test_rent_capital_refunds_overpayment() {
        let mut p = protocol();
        stake(&mut p, "alice", 2_000, 10);

        let required = mul_div(
            120_000u64 * 1_000,
            days_to_seconds(11) - 60,
            u128::from(SECONDS_PER_DAY),
        )
        .expect("price");
        p.handle_deposit(
            "renter",
            TokenKind::Base,
            required + 777,
            "|rent_capital|worker.acct|1000|0|",
            60,
        )
        .expect("rent");

        let refund = p
            .outbox
            .iter()
            .find(|t| t.to == "renter")
            .expect("refund");
        assert_eq!(refund.amount, 777);
        assert_eq!(p.global.pending_revenue, required);
    }

    #[test]
    fn test_rent_bounds_enforced() {
        let mut p = protocol();
        stake(&mut p, "alice", 2_000, 10);
        assert!(matches!(
            p.rent_capital("renter", "worker.acct", 5, 0, 1_000_000, 60),
            Err(CoreError::RentBounds { .. })
        ));
    }

    #[test]
    fn test_rent_closed_window_rejected() {
        let mut p = protocol();
        stake(&mut p, "alice", 2_000, 10);
        // a key that is not one of the three live windows
        assert!(matches!(
            p.rent_capital("renter", "worker.acct", 100, 999, 1_000_000_000, 60),
            Err(CoreError::Epoch(melt_epoch::EpochError::WindowNotRentable { .. }))
        ));
    }

    #[test]
    fn test_reallocate_after_window_closes() {
        let mut p = protocol();
        stake(&mut p, "alice", 1_000, 10);
        p.commit_to_lending(days_to_seconds(4)).expect("commit");
        p.request_exit("alice", 300 * UNITS_PER_TOKEN, false, days_to_seconds(4) + 5)
            .expect("exit");
        let window = p.global.last_epoch_start + p.config.epoch_spacing_secs;
        p.handle_deposit(
            "lender.two",
            TokenKind::Base,
            1_000 * UNITS_PER_TOKEN,
            "lending return",
            window + days_to_seconds(8),
        )
        .expect("return");

        // nobody claims during the window; after it closes the pool is
        // restaked
        let after_close = window + days_to_seconds(14) + days_to_seconds(2) + 10;
        assert!(matches!(
            p.reallocate_expired(window + days_to_seconds(14) + 10),
            Err(CoreError::RedemptionStillOpen { .. })
        ));
        p.reallocate_expired(after_close).expect("reallocate");
        assert_eq!(p.global.redemption_pool, 0);
        assert_eq!(p.global.available_for_lending, 1_000 * UNITS_PER_TOKEN);
    }

    #[test]
    fn test_reallocate_with_empty_pool_rejected() {
        let mut p = protocol();
        assert!(matches!(
            p.reallocate_expired(days_to_seconds(3)),
            Err(CoreError::NothingToReallocate)
        ));
    }
}
