use mm_lib::service::liquidity::LiquidityService;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum AccountCommands {
    #[command(about = "Account liquidity of one user")]
    Liquidity {
        #[arg(long)]
        user: String,

        /// RFC 3339 time to value at, defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    #[command(about = "List accounts with negative liquidity")]
    Underwater {
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

pub fn handle(service: Arc<LiquidityService>, command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Liquidity { user, at } => {
            handle_liquidity(service, &user, at.unwrap_or_else(Utc::now))
        }
        AccountCommands::Underwater { at } => {
            handle_underwater(service, at.unwrap_or_else(Utc::now))
        }
    }
}

//handlers
pub fn handle_liquidity(service: Arc<LiquidityService>, user: &str, at: DateTime<Utc>) -> Result<()> {
    let value = service.account_liquidity(user, at)?;

    info!(
        "{} at {}: collateral {} debt {} liquidity {}",
        user, at, value.collateral_value, value.debt_value, value.liquidity
    );
    Ok(())
}

pub fn handle_underwater(service: Arc<LiquidityService>, at: DateTime<Utc>) -> Result<()> {
    let accounts = service.underwater(at)?;
    if accounts.is_empty() {
        info!("No underwater accounts at {}", at);
        return Ok(());
    }

    warn!("{} underwater accounts at {}", accounts.len(), at);
    for (user, value) in accounts {
        info!(
            "{}: collateral {} debt {} shortfall {}",
            user, value.collateral_value, value.debt_value, -value.liquidity
        );
    }
    Ok(())
}
