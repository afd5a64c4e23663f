//! Outbox token transfers.
//!
//! The core never moves tokens itself. Operations append [`TokenTransfer`]
//! entries to an outbox; the host drains it after a successful commit and
//! performs the transfers through the wallet contract. The memo travels with
//! the transfer so collaborators can route follow-up behavior.

use serde::{Deserialize, Serialize};

use crate::{AccountId, TokenAmount};

/// Which token a transfer moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// The underlying base token.
    Base,
    /// The liquid wrapper token.
    Liquid,
}

/// One pending outbound transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Destination account.
    pub to: AccountId,
    /// Token to move.
    pub token: TokenKind,
    /// Amount in raw units.
    pub amount: TokenAmount,
    /// Routing memo carried with the transfer.
    pub memo: String,
}

impl TokenTransfer {
    /// Build a base-token transfer.
    pub fn base(to: impl Into<AccountId>, amount: TokenAmount, memo: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            token: TokenKind::Base,
            amount,
            memo: memo.into(),
        }
    }

    /// Build a liquid-token transfer.
    pub fn liquid(to: impl Into<AccountId>, amount: TokenAmount, memo: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            token: TokenKind::Liquid,
            amount,
            memo: memo.into(),
        }
    }
}
