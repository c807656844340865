use mm_lib::{store::Store, types::Market};

use anyhow::{anyhow, Result};
use clap::Subcommand;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum MarketCommands {
    #[command(about = "List every market with its last persisted snapshot")]
    List,

    #[command(about = "Show one market by asset or ctoken asset id")]
    Show {
        #[arg(long)]
        asset: String,
    },
}

pub fn handle(store: Arc<dyn Store>, command: MarketCommands) -> Result<()> {
    match command {
        MarketCommands::List => handle_list(store),
        MarketCommands::Show { asset } => handle_show(store, &asset),
    }
}

//handlers
pub fn handle_list(store: Arc<dyn Store>) -> Result<()> {
    let markets = store.list_markets()?;
    info!("{} markets", markets.len());

    for market in markets {
        info!(
            "{} ({}) status {:?} price {} cash {} borrows {} reserves {} ctokens {} version {}",
            market.symbol,
            market.asset_id,
            market.status,
            market.price,
            market.total_cash,
            market.total_borrows,
            market.reserves,
            market.ctokens,
            market.version,
        );
    }

    Ok(())
}

pub fn handle_show(store: Arc<dyn Store>, asset: &str) -> Result<()> {
    let market = match store.find_market(asset)? {
        Some(market) => market,
        None => store
            .find_market_by_ctoken(asset)?
            .ok_or_else(|| anyhow!("No market for asset {}", asset))?,
    };

    print_market(&market);
    Ok(())
}

fn print_market(market: &Market) {
    info!("Market {} ({})", market.symbol, market.asset_id);
    info!("  ctoken asset      {}", market.ctoken_asset_id);
    info!("  status            {:?}", market.status);
    info!("  block             {}", market.block_number);
    info!("  price             {} at {:?}", market.price, market.price_updated_at);
    info!("  total cash        {}", market.total_cash);
    info!("  total borrows     {}", market.total_borrows);
    info!("  reserves          {}", market.reserves);
    info!("  ctokens           {}", market.ctokens);
    info!("  exchange rate     {}", market.exchange_rate);
    info!("  utilization       {}", market.utilization_rate);
    info!("  borrow rate/block {}", market.borrow_rate_per_block);
    info!("  supply rate/block {}", market.supply_rate_per_block);
    info!("  borrow index      {}", market.borrow_index);
    info!(
        "  factors           collateral {} close {} reserve {} incentive {}",
        market.collateral_factor,
        market.close_factor,
        market.reserve_factor,
        market.liquidation_incentive,
    );
    info!(
        "  rate model        base {} multiplier {} jump {} kink {}",
        market.base_rate, market.multiplier, market.jump_multiplier, market.kink,
    );
    info!("  borrow cap        {}", market.borrow_cap);
    info!("  version           {}", market.version);
}
