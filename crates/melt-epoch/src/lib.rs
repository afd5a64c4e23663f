//! # melt-epoch
//!
//! The lending-window ledger: overlapping fixed-length windows opened on a
//! fixed cadence, each assigned to one provider from a round-robin ring.
//!
//! Windows are advanced lazily. Every state-changing operation first calls
//! [`sync_epoch`], which catches the pointer up across however many window
//! starts have passed since the last interaction, creating any records that
//! were skipped. Rental pricing is derived purely from where `now` falls
//! relative to the three live windows.

use melt_math::MathError;
use melt_types::{AccountId, Timestamp};

mod ledger;
mod ring;

pub use ledger::{
    apply_lending_return, rental_term_secs, sync_epoch, window_for_provider, EpochStore,
};
pub use ring::ProviderRing;

/// Error types for the lending-window ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EpochError {
    /// The provider ring cannot produce a successor.
    #[error("provider rotation failed: {0}")]
    ProviderRotation(String),

    /// The named window is not one of the three rentable ones, or its
    /// rental cutoff has passed.
    #[error("window {epoch_id} is not open for rental at {now}")]
    WindowNotRentable {
        /// The rejected window key.
        epoch_id: Timestamp,
        /// The rejecting time.
        now: Timestamp,
    },

    /// No record exists for the named window.
    #[error("no record for window {0}")]
    UnknownWindow(Timestamp),

    /// No live window belongs to the named provider.
    #[error("no live window lent to {0}")]
    NoWindowForProvider(AccountId),

    /// Arithmetic failure in window math.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Convenience result type for window operations.
pub type Result<T> = std::result::Result<T, EpochError>;
