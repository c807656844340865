pub mod memory;
pub mod postgres;

use crate::constant::{DEFAULT_VERSION, PROPERTY_OUTPUTS_CHECKPOINT, PROPERTY_SYSTEM_VERSION};
use crate::types::{Borrow, Market, OracleSigner, Proposal, Supply, Transaction, Transfer};

use anyhow::{anyhow, Result};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// An entity write guarded by the version it was loaded with. `None` means
/// the entity did not exist and is created; creating one that already
/// exists, or updating one whose stored version moved on, is a silent no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignerChange {
    Add(OracleSigner),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeChange {
    Add { scope: String, user_id: String },
    Remove { scope: String, user_id: String },
}

/// Everything one output produces, committed as a single unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub markets: Vec<Versioned<Market>>,
    pub supplies: Vec<Versioned<Supply>>,
    pub borrows: Vec<Versioned<Borrow>>,
    pub proposals: Vec<Versioned<Proposal>>,
    pub transaction: Option<Transaction>,
    pub transfers: Vec<Transfer>,
    pub properties: Vec<(String, String)>,
    pub signer_changes: Vec<SignerChange>,
    pub scope_changes: Vec<ScopeChange>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.supplies.is_empty()
            && self.borrows.is_empty()
            && self.proposals.is_empty()
            && self.transaction.is_none()
            && self.transfers.is_empty()
            && self.properties.is_empty()
            && self.signer_changes.is_empty()
            && self.scope_changes.is_empty()
    }
}

pub trait Store: Send + Sync {
    fn find_market(&self, asset_id: &str) -> Result<Option<Market>>;
    fn find_market_by_ctoken(&self, ctoken_asset_id: &str) -> Result<Option<Market>>;
    fn list_markets(&self) -> Result<Vec<Market>>;

    fn find_supply(&self, user_id: &str, ctoken_asset_id: &str) -> Result<Option<Supply>>;
    fn list_supplies(&self, user_id: &str) -> Result<Vec<Supply>>;

    fn find_borrow(&self, user_id: &str, asset_id: &str) -> Result<Option<Borrow>>;
    fn list_borrows(&self, user_id: &str) -> Result<Vec<Borrow>>;
    fn list_all_borrows(&self) -> Result<Vec<Borrow>>;
    /// Distinct users holding a borrow row, sorted.
    fn list_borrowers(&self) -> Result<Vec<String>>;

    fn find_transaction(&self, trace_id: &str) -> Result<Option<Transaction>>;
    fn find_proposal(&self, trace_id: &str) -> Result<Option<Proposal>>;
    fn list_transfers(&self, output_id: i64) -> Result<Vec<Transfer>>;

    fn list_oracle_signers(&self) -> Result<Vec<OracleSigner>>;
    /// A scope is restricted once it has at least one allow-list entry.
    fn is_scope_restricted(&self, scope: &str) -> Result<bool>;
    fn is_allowed(&self, scope: &str, user_id: &str) -> Result<bool>;

    fn find_property(&self, key: &str) -> Result<Option<String>>;
    fn save_property(&self, key: &str, value: &str) -> Result<()>;

    fn commit(&self, changeset: &Changeset) -> Result<()>;

    fn protocol_version(&self) -> Result<i64> {
        match self.find_property(PROPERTY_SYSTEM_VERSION)? {
            Some(value) => parse_i64(PROPERTY_SYSTEM_VERSION, &value),
            None => Ok(DEFAULT_VERSION),
        }
    }

    fn checkpoint(&self) -> Result<i64> {
        match self.find_property(PROPERTY_OUTPUTS_CHECKPOINT)? {
            Some(value) => parse_i64(PROPERTY_OUTPUTS_CHECKPOINT, &value),
            None => Ok(0),
        }
    }

    fn save_checkpoint(&self, output_id: i64) -> Result<()> {
        self.save_property(PROPERTY_OUTPUTS_CHECKPOINT, &output_id.to_string())
    }
}

fn parse_i64(key: &str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|e| anyhow!("Property {} holds non-integer {}: {}", key, value, e))
}
