use crate::engine::{accrual, liquidity};
use crate::service::worker_pool::WorkerPool;
use crate::store::Store;
use crate::types::{AccountLiquidity, Borrow, Market, Supply, System};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

struct Account {
    user_id: String,
    supplies: Vec<Supply>,
    borrows: Vec<Borrow>,
}

/// Read-only liquidity reporting. Accrues copies of the markets to the
/// requested time and never writes them back.
pub struct LiquidityService {
    system: Arc<System>,
    store: Arc<dyn Store>,
    pool: Arc<WorkerPool>,
}

impl LiquidityService {
    pub fn new(system: Arc<System>, store: Arc<dyn Store>, pool: Arc<WorkerPool>) -> Self {
        LiquidityService {
            system,
            store,
            pool,
        }
    }

    fn markets_at(&self, at: DateTime<Utc>) -> Result<Vec<Market>> {
        let block = self.system.block_at(at);
        let mut markets = self.store.list_markets()?;
        for market in markets.iter_mut() {
            accrual::accrue_interest(market, block);
        }
        Ok(markets)
    }

    pub fn account_liquidity(&self, user_id: &str, at: DateTime<Utc>) -> Result<AccountLiquidity> {
        let markets = self.markets_at(at)?;
        let supplies = self.store.list_supplies(user_id)?;
        let borrows = self.store.list_borrows(user_id)?;

        liquidity::account_liquidity_on(&self.pool, &supplies, &borrows, &markets, &[])
            .map_err(|code| anyhow!("Liquidity of {} unavailable: {}", user_id, code))
    }

    /// Liquidity of every account holding a borrow row, valued in parallel.
    pub fn snapshot(&self, at: DateTime<Utc>) -> Result<Vec<(String, AccountLiquidity)>> {
        let markets = self.markets_at(at)?;

        let mut accounts = Vec::new();
        for user_id in self.store.list_borrowers()? {
            accounts.push(Account {
                supplies: self.store.list_supplies(&user_id)?,
                borrows: self.store.list_borrows(&user_id)?,
                user_id,
            });
        }

        let values = self.pool.map(&accounts, |account| {
            liquidity::account_liquidity(&account.supplies, &account.borrows, &markets, &[])
        });

        let mut snapshot = Vec::with_capacity(accounts.len());
        for (account, value) in accounts.into_iter().zip(values) {
            match value {
                Ok(value) => snapshot.push((account.user_id, value)),
                Err(code) => debug!("Skipping {} in snapshot: {}", account.user_id, code),
            }
        }
        Ok(snapshot)
    }

    /// Accounts that can currently be liquidated.
    pub fn underwater(&self, at: DateTime<Utc>) -> Result<Vec<(String, AccountLiquidity)>> {
        Ok(self
            .snapshot(at)?
            .into_iter()
            .filter(|(_, value)| value.liquidity < Decimal::ZERO)
            .collect())
    }
}
