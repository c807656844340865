mod common;

use common::{dec, Harness, FEE_ASSET};
use mm_lib::error::ErrorCode;
use mm_lib::handler::Processed;
use mm_lib::operation::{AdminAction, BorrowParams, LiquidateParams, Operation, PriceParams};
use mm_lib::store::Store;

fn liquidate(user_id: &str) -> Operation {
    Operation::Liquidate(LiquidateParams {
        user_id: user_id.to_string(),
        ctoken_asset_id: "cbtc".to_string(),
    })
}

/// u1 holds 10 cbtc of collateral against 700 usdt of debt.
fn setup() -> Harness {
    let mut h = Harness::new();
    h.add_market("usdt", "cusdt", "1");
    h.add_market("btc", "cbtc", "100");

    h.submit("u2", "usdt", "10000", Operation::Supply);
    h.submit("u1", "btc", "10", Operation::QuickPledge);
    let (_, processed) = h.submit(
        "u1",
        FEE_ASSET,
        "0.0001",
        Operation::Borrow(BorrowParams {
            asset_id: "usdt".into(),
            amount: dec("700"),
        }),
    );
    assert_eq!(processed, Processed::Applied);
    h
}

fn drop_btc_price(h: &mut Harness, price: &str) {
    h.pass(AdminAction::ProvidePrice(PriceParams {
        asset_id: "btc".into(),
        price: dec(price),
    }));
    assert_eq!(h.market("btc").price, dec(price));
}

#[test]
fn healthy_account_cannot_be_seized() {
    let mut h = setup();
    let (output, processed) = h.submit("u3", "usdt", "100", liquidate("u1"));

    assert_eq!(processed, Processed::Rejected(ErrorCode::SeizeNotAllowed));
    assert_eq!(h.transfer_of(&output, "usdt").amount, dec("100"));
}

#[test]
fn repay_is_clamped_to_seizable_collateral() {
    let mut h = setup();
    drop_btc_price(&mut h, "90");

    // seize at most 5 btc at a discounted 81 = 405
    let (output, processed) = h.submit("u3", "usdt", "1000", liquidate("u1"));
    assert_eq!(processed, Processed::Applied);

    assert_eq!(h.transfer_of(&output, "cbtc").amount, dec("5"));
    assert_eq!(h.transfer_of(&output, "usdt").amount, dec("595"));

    let supply = h.store.find_supply("u1", "cbtc").unwrap().unwrap();
    assert_eq!(supply.collaterals, dec("5"));
    let borrow = h.store.find_borrow("u1", "usdt").unwrap().unwrap();
    assert_eq!(borrow.principal, dec("295"));

    let market = h.market("usdt");
    assert_eq!(market.total_borrows, dec("295"));
    assert_eq!(market.total_cash, dec("9705"));
}

#[test]
fn small_payment_is_used_in_full() {
    let mut h = setup();
    drop_btc_price(&mut h, "90");

    let (output, processed) = h.submit("u3", "usdt", "81", liquidate("u1"));
    assert_eq!(processed, Processed::Applied);
    assert_eq!(h.transfer_of(&output, "cbtc").amount, dec("1"));
    assert!(h.transfers(&output).iter().all(|t| t.asset_id != "usdt"));

    let borrow = h.store.find_borrow("u1", "usdt").unwrap().unwrap();
    assert_eq!(borrow.principal, dec("619"));
}

#[test]
fn self_liquidation_is_rejected() {
    let mut h = setup();
    drop_btc_price(&mut h, "90");

    let (_, processed) = h.submit("u1", "usdt", "100", liquidate("u1"));
    assert_eq!(processed, Processed::Rejected(ErrorCode::InvalidArgument));
}

#[test]
fn liquidating_unknown_debt_is_rejected() {
    let mut h = setup();
    drop_btc_price(&mut h, "90");

    let (_, processed) = h.submit("u3", "usdt", "100", liquidate("u4"));
    assert_eq!(processed, Processed::Rejected(ErrorCode::SupplyNotFound));

    let (_, processed) = h.submit("u3", "eth", "100", liquidate("u1"));
    assert_eq!(processed, Processed::Rejected(ErrorCode::MarketNotFound));
}
