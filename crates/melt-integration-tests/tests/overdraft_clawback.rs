//! Integration test: Overdraft clawback across multiple windows.
//!
//! A queued exit leaves the stake in place, so a later balance-reducing
//! operation can leave the account reserving more than it holds. The
//! clawback must remove exactly the deficit, newest window first, and
//! release the matching earmarks.

use melt_core::Protocol;
use melt_math::{asset_share, mul_div};
use melt_types::{days_to_seconds, ProtocolConfig, TokenKind, SECONDS_PER_DAY, UNITS_PER_TOKEN};

fn protocol() -> Protocol {
    Protocol::init(ProtocolConfig::default(), 120_000, 0).expect("init")
}

#[test]
fn clawback_removes_exactly_the_deficit_newest_first() {
    let mut p = protocol();
    p.handle_deposit("alice", TokenKind::Base, 2_000 * UNITS_PER_TOKEN, "stake", 10)
        .expect("stake");

    // spread capital across two windows: a rental into the current one,
    // then a commit into the next
    let rent_cost = 120_000u64 * 500 * 11;
    p.handle_deposit(
        "renter",
        TokenKind::Base,
        rent_cost,
        "|rent_capital|worker.acct|500|0|",
        3_600,
    )
    .expect("rent");
    p.commit_to_lending(days_to_seconds(2)).expect("commit");

    let current = 0;
    let next = p.global.last_epoch_start + p.config.epoch_spacing_secs;
    assert_eq!(p.epochs.get(&current).expect("window").bucket, 500 * UNITS_PER_TOKEN);

    // the commit first rolls the reward period, which distributes the
    // rent revenue and credits its ecosystem share back to the lendable
    // balance, so the committed bucket carries that share too
    let rent_revenue = mul_div(
        120_000u64 * 500,
        days_to_seconds(11) - 3_600,
        u128::from(SECONDS_PER_DAY),
    )
    .expect("price");
    let ecosystem_share = asset_share(rent_revenue, 8_000_000).expect("share");
    assert_eq!(
        p.epochs.get(&next).expect("window").bucket,
        1_500 * UNITS_PER_TOKEN + ecosystem_share
    );

    // the exit walks oldest first: 500 against the current window, 700
    // against the next
    p.request_exit("alice", 1_200 * UNITS_PER_TOKEN, false, days_to_seconds(2) + 60)
        .expect("exit");
    let store = p.pending_requests("alice");
    assert_eq!(store.len(), 2);
    assert_eq!(store[0].epoch_id, current);
    assert_eq!(store[0].amount, 500 * UNITS_PER_TOKEN);
    assert_eq!(store[1].epoch_id, next);
    assert_eq!(store[1].amount, 700 * UNITS_PER_TOKEN);

    // liquifying 1,000 drops the balance to 1,000 against 1,200
    // reserved; exactly the 200 deficit comes off the newest request
    p.liquify("alice", 1_000 * UNITS_PER_TOKEN, days_to_seconds(2) + 120)
        .expect("liquify");
    let store = p.pending_requests("alice");
    assert_eq!(store[0].amount, 500 * UNITS_PER_TOKEN, "oldest untouched");
    assert_eq!(store[1].amount, 500 * UNITS_PER_TOKEN);
    assert_eq!(p.epochs.get(&next).expect("window").earmark, 500 * UNITS_PER_TOKEN);

    // a deeper cut consumes the newest request entirely and trims the
    // oldest by the remainder
    p.liquify("alice", 600 * UNITS_PER_TOKEN, days_to_seconds(2) + 180)
        .expect("liquify");
    let store = p.pending_requests("alice");
    assert_eq!(store.len(), 1);
    assert_eq!(store[0].epoch_id, current);
    assert_eq!(store[0].amount, 400 * UNITS_PER_TOKEN);
    assert_eq!(p.epochs.get(&current).expect("window").earmark, 400 * UNITS_PER_TOKEN);
    assert_eq!(p.epochs.get(&next).expect("window").earmark, 0);

    // conservation: what is reserved equals what is requested
    let requested: u64 = p.pending_requests("alice").iter().map(|r| r.amount).sum();
    assert_eq!(requested, p.epochs.get(&current).expect("window").earmark);
}

#[test]
fn balanced_books_need_no_clawback() {
    let mut p = protocol();
    p.handle_deposit("alice", TokenKind::Base, 2_000 * UNITS_PER_TOKEN, "stake", 10)
        .expect("stake");
    p.commit_to_lending(days_to_seconds(2)).expect("commit");
    p.request_exit("alice", 500 * UNITS_PER_TOKEN, false, days_to_seconds(2) + 60)
        .expect("exit");

    // plenty of balance left; the liquify must not touch the request
    p.liquify("alice", 1_000 * UNITS_PER_TOKEN, days_to_seconds(2) + 120)
        .expect("liquify");
    let store = p.pending_requests("alice");
    assert_eq!(store.len(), 1);
    assert_eq!(store[0].amount, 500 * UNITS_PER_TOKEN);
}
