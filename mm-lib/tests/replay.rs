mod common;

use common::{dec, Harness, FEE_ASSET};
use mm_lib::error::ErrorCode;
use mm_lib::handler::Processed;
use mm_lib::operation::{BorrowParams, Operation};
use mm_lib::store::Store;

fn setup() -> Harness {
    let mut h = Harness::new();
    h.add_market("usdt", "cusdt", "1");
    h.add_market("btc", "cbtc", "100");
    h
}

#[test]
fn reprocessing_an_applied_output_changes_nothing() {
    let mut h = setup();
    let output = h.output("u1", "usdt", "100", &Operation::Supply);

    assert_eq!(h.processor.process(&output).unwrap(), Processed::Applied);
    let market = h.market("usdt");
    let transfers = h.store.transfers().unwrap();

    assert_eq!(h.processor.process(&output).unwrap(), Processed::Replayed);
    assert_eq!(h.market("usdt"), market);
    assert_eq!(h.store.transfers().unwrap(), transfers);
}

#[test]
fn reprocessing_a_rejected_output_keeps_one_refund() {
    let mut h = setup();
    let output = h.output("u1", "eth", "3", &Operation::Supply);

    assert_eq!(
        h.processor.process(&output).unwrap(),
        Processed::Rejected(ErrorCode::MarketNotFound)
    );
    assert_eq!(h.processor.process(&output).unwrap(), Processed::Replayed);

    let refunds = h.transfers(&output);
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, dec("3"));
}

#[test]
fn replay_reuses_the_recorded_outcome() {
    let mut h = setup();
    h.submit("u2", "usdt", "1000", Operation::Supply);
    h.submit("u1", "btc", "10", Operation::QuickPledge);

    let output = h.output(
        "u1",
        FEE_ASSET,
        "0.0001",
        &Operation::Borrow(BorrowParams {
            asset_id: "usdt".into(),
            amount: dec("700"),
        }),
    );
    assert_eq!(h.processor.process(&output).unwrap(), Processed::Applied);

    // live state would now reject a second borrow of 700
    assert_eq!(h.processor.process(&output).unwrap(), Processed::Replayed);
    let borrow = h.store.find_borrow("u1", "usdt").unwrap().unwrap();
    assert_eq!(borrow.principal, dec("700"));
    assert_eq!(borrow.version, output.id);
    assert_eq!(h.transfers(&output).len(), 2);
}

#[test]
fn failed_commit_writes_nothing_and_retries_cleanly() {
    let mut h = setup();
    let output = h.output("u1", "usdt", "100", &Operation::Supply);

    h.store.fail_next_commits(1).unwrap();
    assert!(h.processor.process(&output).is_err());
    assert!(h.transfers(&output).is_empty());
    assert_eq!(h.market("usdt").total_cash, dec("0"));
    assert!(h.store.find_transaction(&output.trace_id).unwrap().is_none());

    assert_eq!(h.processor.process(&output).unwrap(), Processed::Applied);
    assert_eq!(h.market("usdt").total_cash, dec("100"));
    assert_eq!(h.transfers(&output).len(), 1);
}

#[test]
fn governance_vote_replay_applies_effect_once() {
    let mut h = Harness::new();
    let (proposal, _) = h.propose(
        "m1",
        mm_lib::operation::AdminAction::UpsertMarket(common::market_params("usdt", "cusdt", "1")),
    );
    h.vote("m1", &proposal.trace_id);
    h.vote("m2", &proposal.trace_id);

    let vote = h.output(
        "m3",
        FEE_ASSET,
        "0.0001",
        &Operation::ProposalVote(mm_lib::operation::VoteParams {
            trace_id: proposal.trace_id.clone(),
        }),
    );
    assert_eq!(h.processor.process(&vote).unwrap(), Processed::Applied);
    let market = h.market("usdt");

    assert_eq!(h.processor.process(&vote).unwrap(), Processed::Replayed);
    assert_eq!(h.market("usdt"), market);
    let stored = h.store.find_proposal(&proposal.trace_id).unwrap().unwrap();
    assert_eq!(stored.votes.len(), 3);
    assert_eq!(stored.version, vote.id);
}
