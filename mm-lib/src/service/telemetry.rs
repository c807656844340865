use crate::config::TelemetryConfig;
use crate::service::liquidity::LiquidityService;
use crate::store::Store;
use crate::utils;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, GaugeVec, IntGauge, Opts, Registry, TextEncoder};
use rust_decimal::prelude::ToPrimitive;
use std::fs;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use tokio::time::{interval, Duration};
use tracing::{error, trace, warn};

/// Market and liquidity gauges. Reads the store and exports text; never
/// writes authoritative rows.
pub struct Telemetry {
    config: TelemetryConfig,
    store: Arc<dyn Store>,
    liquidity: Arc<LiquidityService>,
    last_output_id: Arc<AtomicI64>,

    registry: Registry,
    utilization_rate: GaugeVec,
    exchange_rate: GaugeVec,
    borrow_rate: GaugeVec,
    supply_rate: GaugeVec,
    price: GaugeVec,
    total_cash: GaugeVec,
    total_borrows: GaugeVec,
    market_version: GaugeVec,
    underwater_accounts: IntGauge,
    last_output: IntGauge,
}

fn gauge_vec(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), &["asset"])?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn int_gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl Telemetry {
    pub fn new(
        config: TelemetryConfig,
        store: Arc<dyn Store>,
        liquidity: Arc<LiquidityService>,
        last_output_id: Arc<AtomicI64>,
    ) -> Result<Self> {
        let registry = Registry::new_custom(Some("mm".to_string()), None)?;

        Ok(Telemetry {
            utilization_rate: gauge_vec(&registry, "market_utilization_rate", "Market utilization rate")?,
            exchange_rate: gauge_vec(&registry, "market_exchange_rate", "ctoken exchange rate")?,
            borrow_rate: gauge_vec(&registry, "market_borrow_rate_per_block", "Borrow rate per block")?,
            supply_rate: gauge_vec(&registry, "market_supply_rate_per_block", "Supply rate per block")?,
            price: gauge_vec(&registry, "market_price", "Last accepted price")?,
            total_cash: gauge_vec(&registry, "market_total_cash", "Cash held by the market")?,
            total_borrows: gauge_vec(&registry, "market_total_borrows", "Outstanding borrows")?,
            market_version: gauge_vec(&registry, "market_version", "Output id of the last market write")?,
            underwater_accounts: int_gauge(&registry, "underwater_accounts", "Accounts with negative liquidity")?,
            last_output: int_gauge(&registry, "last_output_id", "Last processed output id")?,
            registry,
            config,
            store,
            liquidity,
            last_output_id,
        })
    }

    pub fn refresh_markets(&self) -> Result<()> {
        for market in self.store.list_markets()? {
            let asset = [market.asset_id.as_str()];
            let set = |gauge: &GaugeVec, value: rust_decimal::Decimal| {
                gauge
                    .with_label_values(&asset)
                    .set(value.to_f64().unwrap_or_default());
            };
            set(&self.utilization_rate, market.utilization_rate);
            set(&self.exchange_rate, market.exchange_rate);
            set(&self.borrow_rate, market.borrow_rate_per_block);
            set(&self.supply_rate, market.supply_rate_per_block);
            set(&self.price, market.price);
            set(&self.total_cash, market.total_cash);
            set(&self.total_borrows, market.total_borrows);
            self.market_version
                .with_label_values(&asset)
                .set(market.version as f64);
        }
        self.last_output
            .set(self.last_output_id.load(Ordering::Relaxed));
        Ok(())
    }

    pub fn refresh_liquidity(&self, at: DateTime<Utc>) -> Result<usize> {
        let underwater = self.liquidity.underwater(at)?;
        for (user_id, value) in &underwater {
            trace!(
                "Account {} underwater by {}",
                user_id,
                utils::format_decimal(-value.liquidity)
            );
        }
        self.underwater_accounts.set(underwater.len() as i64);
        Ok(underwater.len())
    }

    /// Prometheus text exposition of every gauge.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| anyhow!("Metrics are not utf-8: {}", e))
    }

    fn export(&self) -> Result<()> {
        if let Some(path) = &self.config.metrics_file {
            fs::write(path, self.render()?)?;
        }
        Ok(())
    }

    pub async fn run_markets(&self) {
        warn!("Market telemetry started");
        let mut ticker = interval(Duration::from_secs(self.config.market_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_markets().and_then(|_| self.export()) {
                error!("Market telemetry failed: {:?}", e);
            }
        }
    }

    pub async fn run_liquidity(&self) {
        warn!("Liquidity telemetry started");
        let mut ticker =
            interval(Duration::from_secs(self.config.liquidity_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_liquidity(Utc::now()).and_then(|_| self.export()) {
                error!("Liquidity telemetry failed: {:?}", e);
            }
        }
    }
}
