pub mod allow_list;
pub mod borrow;
pub mod market;
pub mod oracle_signer;
pub mod output;
pub mod property;
pub mod proposal;
pub mod supply;
pub mod transaction;
pub mod transfer;

use crate::models::{
    allow_list::{AllowList, NewAllowList},
    borrow::{Borrow, NewBorrow, UpdateBorrow},
    market::{Market, NewMarket, UpdateMarket},
    oracle_signer::{NewOracleSigner, OracleSigner},
    output::Output,
    property::Property,
    proposal::{NewProposal, Proposal, UpdateProposal},
    supply::{NewSupply, Supply, UpdateSupply},
    transaction::{NewTransaction, Transaction},
    transfer::{NewTransfer, Transfer},
};

use diesel::prelude::*;

// Write methods take the caller's connection so several repositories can
// share one database transaction. `update_if_version` returns `false` when
// the stored version no longer matches; that is not an error.

pub trait MarketRepository {
    fn create(&self, conn: &mut PgConnection, market: &NewMarket) -> QueryResult<bool>;
    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        asset_id: &str,
        market: &UpdateMarket,
        expected_version: i64,
    ) -> QueryResult<bool>;
    fn find_by_asset_id(&self, asset_id: &str) -> QueryResult<Option<Market>>;
    fn find_by_ctoken_asset_id(&self, ctoken_asset_id: &str) -> QueryResult<Option<Market>>;
    fn find_all(&self) -> QueryResult<Vec<Market>>;
}

pub trait SupplyRepository {
    fn create(&self, conn: &mut PgConnection, supply: &NewSupply) -> QueryResult<bool>;
    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        user_id: &str,
        ctoken_asset_id: &str,
        supply: &UpdateSupply,
        expected_version: i64,
    ) -> QueryResult<bool>;
    fn find(&self, user_id: &str, ctoken_asset_id: &str) -> QueryResult<Option<Supply>>;
    fn find_by_user(&self, user_id: &str) -> QueryResult<Vec<Supply>>;
}

pub trait BorrowRepository {
    fn create(&self, conn: &mut PgConnection, borrow: &NewBorrow) -> QueryResult<bool>;
    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        user_id: &str,
        asset_id: &str,
        borrow: &UpdateBorrow,
        expected_version: i64,
    ) -> QueryResult<bool>;
    fn find(&self, user_id: &str, asset_id: &str) -> QueryResult<Option<Borrow>>;
    fn find_by_user(&self, user_id: &str) -> QueryResult<Vec<Borrow>>;
    fn find_all(&self) -> QueryResult<Vec<Borrow>>;
    fn find_distinct_users(&self) -> QueryResult<Vec<String>>;
}

pub trait ProposalRepository {
    fn create(&self, conn: &mut PgConnection, proposal: &NewProposal) -> QueryResult<bool>;
    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        trace_id: &str,
        proposal: &UpdateProposal,
        expected_version: i64,
    ) -> QueryResult<bool>;
    fn find_by_trace_id(&self, trace_id: &str) -> QueryResult<Option<Proposal>>;
}

pub trait TransactionRepository {
    fn create(&self, conn: &mut PgConnection, transaction: &NewTransaction) -> QueryResult<bool>;
    fn find_by_trace_id(&self, trace_id: &str) -> QueryResult<Option<Transaction>>;
}

pub trait TransferRepository {
    fn create_transfers(
        &self,
        conn: &mut PgConnection,
        transfers: &[NewTransfer],
    ) -> QueryResult<usize>;
    fn find_by_output_id(&self, output_id: i64) -> QueryResult<Vec<Transfer>>;
}

pub trait OutputRepository {
    fn list_after(&self, after_id: i64, limit: i64) -> QueryResult<Vec<Output>>;
}

pub trait PropertyRepository {
    fn save(&self, conn: &mut PgConnection, key: &str, value: &str) -> QueryResult<()>;
    fn find(&self, key: &str) -> QueryResult<Option<Property>>;
}

pub trait OracleSignerRepository {
    fn create(&self, conn: &mut PgConnection, signer: &NewOracleSigner) -> QueryResult<bool>;
    fn delete(&self, conn: &mut PgConnection, user_id: &str) -> QueryResult<bool>;
    fn find_all(&self) -> QueryResult<Vec<OracleSigner>>;
}

pub trait AllowListRepository {
    fn create(&self, conn: &mut PgConnection, entry: &NewAllowList) -> QueryResult<bool>;
    fn delete(&self, conn: &mut PgConnection, scope: &str, user_id: &str) -> QueryResult<bool>;
    fn find(&self, scope: &str, user_id: &str) -> QueryResult<Option<AllowList>>;
    fn count_by_scope(&self, scope: &str) -> QueryResult<i64>;
}
