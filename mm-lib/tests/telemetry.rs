mod common;

use common::{dec, system, Harness, FEE_ASSET};
use mm_lib::config::TelemetryConfig;
use mm_lib::operation::{AdminAction, BorrowParams, Operation, PriceParams};
use mm_lib::service::{liquidity::LiquidityService, telemetry::Telemetry, worker_pool::WorkerPool};
use mm_lib::store::Store;

use rust_decimal::Decimal;
use std::sync::{atomic::AtomicI64, Arc};

fn indebted() -> Harness {
    let mut h = Harness::new();
    h.add_market("usdt", "cusdt", "1");
    h.add_market("btc", "cbtc", "100");
    h.submit("u2", "usdt", "10000", Operation::Supply);
    h.submit("u1", "btc", "10", Operation::QuickPledge);
    h.submit(
        "u1",
        FEE_ASSET,
        "0.0001",
        Operation::Borrow(BorrowParams {
            asset_id: "usdt".into(),
            amount: dec("700"),
        }),
    );
    h
}

fn liquidity_service(h: &Harness) -> LiquidityService {
    LiquidityService::new(
        Arc::new(system()),
        Arc::clone(&h.store) as Arc<dyn Store>,
        Arc::new(WorkerPool::new(2).unwrap()),
    )
}

#[test]
fn reports_account_liquidity_without_writing() {
    let mut h = indebted();
    let service = liquidity_service(&h);

    let value = service.account_liquidity("u1", h.now()).unwrap();
    assert_eq!(value.collateral_value, dec("750"));
    assert_eq!(value.debt_value, dec("700"));
    assert_eq!(value.liquidity, dec("50"));
    assert!(service.underwater(h.now()).unwrap().is_empty());

    h.pass(AdminAction::ProvidePrice(PriceParams {
        asset_id: "btc".into(),
        price: dec("90"),
    }));
    let version = h.market("usdt").version;

    let underwater = service.underwater(h.now()).unwrap();
    assert_eq!(underwater.len(), 1);
    assert_eq!(underwater[0].0, "u1");
    assert!(underwater[0].1.liquidity < Decimal::ZERO);

    // valuing a later time accrues copies only
    h.advance(15 * 1000);
    let later = service.account_liquidity("u1", h.now()).unwrap();
    assert!(later.debt_value > dec("700"));
    assert_eq!(h.market("usdt").version, version);
}

#[test]
fn renders_market_and_liquidity_gauges() {
    let h = indebted();
    let telemetry = Telemetry::new(
        TelemetryConfig {
            enabled: true,
            market_interval_secs: 1,
            liquidity_interval_secs: 1,
            worker_count: 2,
            metrics_file: None,
        },
        Arc::clone(&h.store) as Arc<dyn Store>,
        Arc::new(liquidity_service(&h)),
        Arc::new(AtomicI64::new(42)),
    )
    .unwrap();

    telemetry.refresh_markets().unwrap();
    assert_eq!(telemetry.refresh_liquidity(h.now()).unwrap(), 0);

    let text = telemetry.render().unwrap();
    assert!(text.contains("mm_market_total_cash{asset=\"usdt\"} 9300"));
    assert!(text.contains("mm_market_price{asset=\"btc\"} 100"));
    assert!(text.contains("mm_last_output_id 42"));
    assert!(text.contains("mm_underwater_accounts 0"));
}
