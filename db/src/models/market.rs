use crate::schema::markets;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use std::hash::{Hash, Hasher};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Market {
    pub id: i32,
    pub symbol: String,
    pub asset_id: String,
    pub ctoken_asset_id: String,
    pub total_cash: String,
    pub total_borrows: String,
    pub reserves: String,
    pub ctokens: String,
    pub init_exchange_rate: String,
    pub reserve_factor: String,
    pub liquidation_incentive: String,
    pub borrow_cap: String,
    pub collateral_factor: String,
    pub close_factor: String,
    pub base_rate: String,
    pub multiplier: String,
    pub jump_multiplier: String,
    pub kink: String,
    pub block_number: i64,
    pub utilization_rate: String,
    pub exchange_rate: String,
    pub supply_rate_per_block: String,
    pub borrow_rate_per_block: String,
    pub price: String,
    pub price_updated_at: Option<NaiveDateTime>,
    pub borrow_index: String,
    pub status: i32,
    pub version: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PartialEq for Market {
    fn eq(&self, other: &Self) -> bool {
        self.asset_id == other.asset_id
    }
}

impl Eq for Market {}

impl Hash for Market {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.asset_id.hash(state);
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = markets)]
pub struct NewMarket {
    pub symbol: String,
    pub asset_id: String,
    pub ctoken_asset_id: String,
    pub total_cash: String,
    pub total_borrows: String,
    pub reserves: String,
    pub ctokens: String,
    pub init_exchange_rate: String,
    pub reserve_factor: String,
    pub liquidation_incentive: String,
    pub borrow_cap: String,
    pub collateral_factor: String,
    pub close_factor: String,
    pub base_rate: String,
    pub multiplier: String,
    pub jump_multiplier: String,
    pub kink: String,
    pub block_number: i64,
    pub utilization_rate: String,
    pub exchange_rate: String,
    pub supply_rate_per_block: String,
    pub borrow_rate_per_block: String,
    pub price: String,
    pub price_updated_at: Option<NaiveDateTime>,
    pub borrow_index: String,
    pub status: i32,
    pub version: i64,
}

/// Full-row changeset used by compare-and-swap updates. Every column is
/// written; only `price_updated_at` is skipped when unset.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = markets)]
pub struct UpdateMarket {
    pub symbol: String,
    pub ctoken_asset_id: String,
    pub total_cash: String,
    pub total_borrows: String,
    pub reserves: String,
    pub ctokens: String,
    pub init_exchange_rate: String,
    pub reserve_factor: String,
    pub liquidation_incentive: String,
    pub borrow_cap: String,
    pub collateral_factor: String,
    pub close_factor: String,
    pub base_rate: String,
    pub multiplier: String,
    pub jump_multiplier: String,
    pub kink: String,
    pub block_number: i64,
    pub utilization_rate: String,
    pub exchange_rate: String,
    pub supply_rate_per_block: String,
    pub borrow_rate_per_block: String,
    pub price: String,
    pub price_updated_at: Option<NaiveDateTime>,
    pub borrow_index: String,
    pub status: i32,
    pub version: i64,
    pub updated_at: Option<NaiveDateTime>,
}
