//! Deposit-memo parsing.

use melt_types::{AccountId, Timestamp};

use crate::{CoreError, Result};

/// A parsed deposit memo.
///
/// Fixed literals route the simple operations; the parameterized ones use
/// pipe-delimited fields with a leading pipe, e.g.
/// `|rent_capital|receiver|1000|1746000000|`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Memo {
    /// `stake` — stake the deposited base tokens.
    Stake,
    /// `unliquify` — convert deposited liquid tokens back to staked.
    Unliquify,
    /// `revenue` — credit the deposit to pending revenue.
    Revenue,
    /// `lending return` — a provider returning lent capital.
    LendingReturn,
    /// `instant redeem` — treasury redeeming liquid tokens at once.
    InstantRedeem,
    /// `rebalance` — treasury redeeming liquid tokens to rebalance.
    Rebalance,
    /// `liquidity` — treasury adding base tokens for liquid issuance.
    Liquidity,
    /// `|rent_capital|receiver|tokens|window|` — rent lending capital.
    RentCapital {
        /// Account the rented capital is delegated to.
        receiver: AccountId,
        /// Whole tokens to rent.
        whole_tokens: u64,
        /// Window to rent from.
        epoch_id: Timestamp,
    },
    /// `|unliquify_exact|minimum|` — unliquify with an output floor.
    UnliquifyExact {
        /// Smallest acceptable staked output.
        min_output: u64,
    },
}

impl Memo {
    /// Parse a transfer memo. Anything unrecognized is a validation error.
    pub fn parse(memo: &str) -> Result<Self> {
        match memo {
            "stake" => return Ok(Self::Stake),
            "unliquify" => return Ok(Self::Unliquify),
            "revenue" => return Ok(Self::Revenue),
            "lending return" => return Ok(Self::LendingReturn),
            "instant redeem" => return Ok(Self::InstantRedeem),
            "rebalance" => return Ok(Self::Rebalance),
            "liquidity" => return Ok(Self::Liquidity),
            _ => {}
        }

        if !memo.starts_with('|') {
            return Err(CoreError::UnknownMemo(memo.to_string()));
        }
        let fields: Vec<&str> = memo.split('|').collect();

        match fields.get(1).copied() {
            Some("rent_capital") => {
                let (receiver, tokens, window) =
                    match (fields.get(2), fields.get(3), fields.get(4)) {
                        (Some(r), Some(t), Some(w)) if !r.is_empty() => (r, t, w),
                        _ => {
                            return Err(CoreError::MalformedMemo(
                                "rent_capital needs receiver, tokens, and window".to_string(),
                            ))
                        }
                    };
                Ok(Self::RentCapital {
                    receiver: (*receiver).to_string(),
                    whole_tokens: parse_number(tokens)?,
                    epoch_id: parse_number(window)?,
                })
            }
            Some("unliquify_exact") => {
                let min = fields.get(2).ok_or_else(|| {
                    CoreError::MalformedMemo("unliquify_exact needs a minimum output".to_string())
                })?;
                Ok(Self::UnliquifyExact {
                    min_output: parse_number(min)?,
                })
            }
            _ => Err(CoreError::UnknownMemo(memo.to_string())),
        }
    }
}

fn parse_number(field: &str) -> Result<u64> {
    field
        .parse::<u64>()
        .map_err(|_| CoreError::MalformedMemo(format!("{field:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_literals() {
        assert_eq!(Memo::parse("stake").expect("parse"), Memo::Stake);
        assert_eq!(Memo::parse("revenue").expect("parse"), Memo::Revenue);
        assert_eq!(
            Memo::parse("lending return").expect("parse"),
            Memo::LendingReturn
        );
        assert_eq!(
            Memo::parse("instant redeem").expect("parse"),
            Memo::InstantRedeem
        );
    }

    #[test]
    fn test_rent_capital_fields() {
        let memo = Memo::parse("|rent_capital|worker.acct|1000|1746000000|").expect("parse");
        assert_eq!(
            memo,
            Memo::RentCapital {
                receiver: "worker.acct".to_string(),
                whole_tokens: 1_000,
                epoch_id: 1_746_000_000,
            }
        );
    }

    #[test]
    fn test_unliquify_exact_field() {
        let memo = Memo::parse("|unliquify_exact|123456|").expect("parse");
        assert_eq!(memo, Memo::UnliquifyExact { min_output: 123_456 });
    }

    #[test]
    fn test_unknown_memo_rejected() {
        assert!(matches!(
            Memo::parse("donation"),
            Err(CoreError::UnknownMemo(_))
        ));
        assert!(matches!(Memo::parse(""), Err(CoreError::UnknownMemo(_))));
        // close but not exact literals stay rejected
        assert!(matches!(
            Memo::parse("Stake"),
            Err(CoreError::UnknownMemo(_))
        ));
    }

    #[test]
    fn test_malformed_pipe_memos_rejected() {
        assert!(matches!(
            Memo::parse("|rent_capital|worker.acct|1000|"),
            Err(CoreError::MalformedMemo(_))
        ));
        assert!(matches!(
            Memo::parse("|rent_capital|worker.acct|ten|5|"),
            Err(CoreError::MalformedMemo(_))
        ));
        assert!(matches!(
            Memo::parse("|unliquify_exact|"),
            Err(CoreError::MalformedMemo(_))
        ));
        assert!(matches!(
            Memo::parse("|withdraw|everything|"),
            Err(CoreError::UnknownMemo(_))
        ));
    }
}
