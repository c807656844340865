mod common;

use common::{dec, Harness, TrustingOracle, FEE_ASSET};
use mm_lib::error::ErrorCode;
use mm_lib::handler::Processed;
use mm_lib::operation::{AdminAction, Operation, PriceAttestation, SignerParams};

use std::sync::Arc;

fn setup() -> Harness {
    let mut h = Harness::with_oracle(Arc::new(TrustingOracle));
    h.add_market("btc", "cbtc", "100");
    h.pass(AdminAction::AddOracleSigner(SignerParams {
        user_id: "oracle-1".into(),
        public_key: "pk-1".into(),
    }));
    h
}

fn attest(asset_id: &str, price: &str, timestamp: i64) -> Operation {
    Operation::ProvidePrice(PriceAttestation {
        asset_id: asset_id.to_string(),
        price: dec(price),
        timestamp,
        signatures: vec![vec![1; 64]],
    })
}

#[test]
fn attested_price_updates_market() {
    let mut h = setup();
    let at = h.now().timestamp() + 60;

    let (output, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "123.45", at));
    assert_eq!(processed, Processed::Applied);
    assert_eq!(h.transfer_of(&output, FEE_ASSET).amount, dec("0.0001"));

    let market = h.market("btc");
    assert_eq!(market.price, dec("123.45"));
    assert_eq!(market.price_updated_at.map(|t| t.timestamp()), Some(at));
    assert_eq!(market.version, output.id);
}

#[test]
fn non_positive_price_is_rejected() {
    let mut h = setup();
    let at = h.now().timestamp() + 60;

    for price in ["0", "-1"] {
        let (output, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", price, at));
        assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));
        assert_eq!(h.transfer_of(&output, FEE_ASSET).amount, dec("0.0001"));
    }
    assert_eq!(h.market("btc").price, dec("100"));
}

#[test]
fn stale_timestamp_is_rejected() {
    let mut h = setup();
    let at = h.now().timestamp() + 60;
    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "110", at));
    assert_eq!(processed, Processed::Applied);

    // equal to the last update
    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "120", at));
    assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));
    // older than the last update
    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "120", at - 1));
    assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));

    let market = h.market("btc");
    assert_eq!(market.price, dec("110"));
    assert_eq!(market.price_updated_at.map(|t| t.timestamp()), Some(at));

    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "120", at + 1));
    assert_eq!(processed, Processed::Applied);
    assert_eq!(h.market("btc").price, dec("120"));
}

#[test]
fn attestation_needs_a_known_market_and_signers() {
    let mut h = Harness::with_oracle(Arc::new(TrustingOracle));
    h.add_market("btc", "cbtc", "100");
    let at = h.now().timestamp() + 60;

    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "110", at));
    assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));

    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("eth", "110", at));
    assert_eq!(processed, Processed::Rejected(ErrorCode::MarketNotFound));
}

#[test]
fn disabled_oracle_refuses_attestations() {
    let mut h = Harness::new();
    h.add_market("btc", "cbtc", "100");
    let at = h.now().timestamp() + 60;

    let (_, processed) = h.submit("u1", FEE_ASSET, "0.0001", attest("btc", "110", at));
    assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));
    assert_eq!(h.market("btc").price, dec("100"));
}
