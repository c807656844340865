use crate::constant::{DEFAULT_VERSION, PROPERTY_SYSTEM_VERSION, PURPOSE_REFUND, PURPOSE_RETURN};
use crate::decoder::Instruction;
use crate::engine::{accrual, liquidity};
use crate::error::{ErrorCode, Evaluation};
use crate::service::worker_pool::WorkerPool;
use crate::store::{Changeset, ScopeChange, SignerChange, Store, Versioned};
use crate::types::{
    AccountLiquidity, Borrow, Market, OracleSigner, Output, Proposal, Supply, System,
    Transaction, Transfer,
};
use crate::utils::{derive_trace_id, trunc8};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;

struct Entry<T> {
    value: T,
    stored_version: Option<i64>,
    dirty: bool,
}

impl<T> Entry<T> {
    fn loaded(value: T, version: i64) -> Self {
        Entry {
            value,
            stored_version: Some(version),
            dirty: false,
        }
    }

    fn created(value: T) -> Self {
        Entry {
            value,
            stored_version: None,
            dirty: true,
        }
    }
}

/// Keeps only dirty entries the output has not already written, stamping
/// them with the output id as their new version.
fn versioned<T>(
    entries: impl Iterator<Item = Entry<T>>,
    output_id: i64,
    set_version: impl Fn(&mut T, i64),
) -> Vec<Versioned<T>> {
    entries
        .filter(|e| e.dirty)
        .filter_map(|mut e| match e.stored_version {
            Some(stored) if stored >= output_id => None,
            expected_version => {
                set_version(&mut e.value, output_id);
                Some(Versioned {
                    value: e.value,
                    expected_version,
                })
            }
        })
        .collect()
}

/// One account's positions with the market snapshots needed to value them.
/// Callers adjust it to evaluate liquidity as if a pending change applied.
#[derive(Debug, Clone)]
pub struct Positions {
    pub user_id: String,
    pub supplies: Vec<Supply>,
    pub borrows: Vec<Borrow>,
    pub markets: Vec<Market>,
    pub overrides: Vec<Market>,
}

impl Positions {
    pub fn adjust_collaterals(&mut self, ctoken_asset_id: &str, delta: Decimal) {
        match self
            .supplies
            .iter_mut()
            .find(|s| s.ctoken_asset_id == ctoken_asset_id)
        {
            Some(supply) => supply.collaterals += delta,
            None => {
                let mut supply = Supply::empty(&self.user_id, ctoken_asset_id);
                supply.collaterals = delta;
                self.supplies.push(supply);
            }
        }
    }

    pub fn override_market(&mut self, market: Market) {
        self.overrides.push(market);
    }
}

/// Working set for a single output: cached rows accrued to the output's
/// block, pending transfers and governance side effects.
pub struct Session<'a> {
    system: &'a System,
    store: &'a dyn Store,
    output: &'a Output,
    instruction: &'a Instruction,
    pool: Option<&'a WorkerPool>,
    block: i64,
    markets: BTreeMap<String, Entry<Market>>,
    ctoken_index: BTreeMap<String, String>,
    supplies: BTreeMap<(String, String), Entry<Supply>>,
    borrows: BTreeMap<(String, String), Entry<Borrow>>,
    proposals: BTreeMap<String, Entry<Proposal>>,
    transfers: Vec<Transfer>,
    properties: BTreeMap<String, String>,
    signer_changes: Vec<SignerChange>,
    scope_changes: Vec<ScopeChange>,
}

impl<'a> Session<'a> {
    pub fn new(
        system: &'a System,
        store: &'a dyn Store,
        output: &'a Output,
        instruction: &'a Instruction,
        pool: Option<&'a WorkerPool>,
    ) -> Self {
        Session {
            system,
            store,
            output,
            instruction,
            pool,
            block: system.block_at(output.created_at),
            markets: BTreeMap::new(),
            ctoken_index: BTreeMap::new(),
            supplies: BTreeMap::new(),
            borrows: BTreeMap::new(),
            proposals: BTreeMap::new(),
            transfers: Vec::new(),
            properties: BTreeMap::new(),
            signer_changes: Vec::new(),
            scope_changes: Vec::new(),
        }
    }

    pub fn system(&self) -> &System {
        self.system
    }

    pub fn store(&self) -> &dyn Store {
        self.store
    }

    pub fn output(&self) -> &'a Output {
        self.output
    }

    pub fn sender(&self) -> &'a str {
        &self.output.sender
    }

    pub fn block(&self) -> i64 {
        self.block
    }

    /// Event time. All time-dependent state uses this, never the wall clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.output.created_at
    }

    // markets

    fn cache_market(&mut self, mut market: Market) {
        accrual::accrue_interest(&mut market, self.block);
        let version = market.version;
        self.ctoken_index
            .insert(market.ctoken_asset_id.clone(), market.asset_id.clone());
        self.markets
            .insert(market.asset_id.clone(), Entry::loaded(market, version));
    }

    fn load_market(&mut self, asset_id: &str) -> Result<()> {
        if self.markets.contains_key(asset_id) {
            return Ok(());
        }
        if let Some(market) = self.store.find_market(asset_id)? {
            self.cache_market(market);
        }
        Ok(())
    }

    pub fn market(&mut self, asset_id: &str) -> Result<Option<Market>> {
        self.load_market(asset_id)?;
        Ok(self.markets.get(asset_id).map(|e| e.value.clone()))
    }

    pub fn market_by_ctoken(&mut self, ctoken_asset_id: &str) -> Result<Option<Market>> {
        if let Some(asset_id) = self.ctoken_index.get(ctoken_asset_id).cloned() {
            return self.market(&asset_id);
        }

        match self.store.find_market_by_ctoken(ctoken_asset_id)? {
            Some(market) => {
                let asset_id = market.asset_id.clone();
                if !self.markets.contains_key(&asset_id) {
                    self.cache_market(market);
                }
                self.market(&asset_id)
            }
            None => Ok(None),
        }
    }

    /// Marks the market as written by this output.
    pub fn market_mut(&mut self, asset_id: &str) -> Result<&mut Market> {
        self.load_market(asset_id)?;
        let entry = self
            .markets
            .get_mut(asset_id)
            .ok_or_else(|| anyhow!("Market {} is not loaded", asset_id))?;
        entry.dirty = true;
        Ok(&mut entry.value)
    }

    pub fn insert_market(&mut self, market: Market) {
        self.ctoken_index
            .insert(market.ctoken_asset_id.clone(), market.asset_id.clone());
        self.markets
            .insert(market.asset_id.clone(), Entry::created(market));
    }

    // positions

    fn load_supply(&mut self, key: &(String, String)) -> Result<()> {
        if self.supplies.contains_key(key) {
            return Ok(());
        }
        if let Some(supply) = self.store.find_supply(&key.0, &key.1)? {
            let version = supply.version;
            self.supplies
                .insert(key.clone(), Entry::loaded(supply, version));
        }
        Ok(())
    }

    pub fn supply(&mut self, user_id: &str, ctoken_asset_id: &str) -> Result<Option<Supply>> {
        let key = (user_id.to_string(), ctoken_asset_id.to_string());
        self.load_supply(&key)?;
        Ok(self.supplies.get(&key).map(|e| e.value.clone()))
    }

    /// Loads or creates the supply row and marks it as written.
    pub fn supply_mut(&mut self, user_id: &str, ctoken_asset_id: &str) -> Result<&mut Supply> {
        let key = (user_id.to_string(), ctoken_asset_id.to_string());
        self.load_supply(&key)?;
        let entry = self
            .supplies
            .entry(key)
            .or_insert_with(|| Entry::created(Supply::empty(user_id, ctoken_asset_id)));
        entry.dirty = true;
        Ok(&mut entry.value)
    }

    fn load_borrow(&mut self, key: &(String, String)) -> Result<()> {
        if self.borrows.contains_key(key) {
            return Ok(());
        }
        if let Some(borrow) = self.store.find_borrow(&key.0, &key.1)? {
            let version = borrow.version;
            self.borrows
                .insert(key.clone(), Entry::loaded(borrow, version));
        }
        Ok(())
    }

    pub fn borrow(&mut self, user_id: &str, asset_id: &str) -> Result<Option<Borrow>> {
        let key = (user_id.to_string(), asset_id.to_string());
        self.load_borrow(&key)?;
        Ok(self.borrows.get(&key).map(|e| e.value.clone()))
    }

    /// Loads or creates the borrow row and marks it as written.
    pub fn borrow_mut(&mut self, user_id: &str, asset_id: &str) -> Result<&mut Borrow> {
        let key = (user_id.to_string(), asset_id.to_string());
        self.load_borrow(&key)?;
        let entry = self
            .borrows
            .entry(key)
            .or_insert_with(|| Entry::created(Borrow::empty(user_id, asset_id)));
        entry.dirty = true;
        Ok(&mut entry.value)
    }

    /// Every position of `user_id`, session copies taking precedence over
    /// stored rows, with the accrued market of each open position.
    pub fn positions(&mut self, user_id: &str) -> Evaluation<Positions> {
        let mut supplies: BTreeMap<String, Supply> = self
            .store
            .list_supplies(user_id)?
            .into_iter()
            .map(|s| (s.ctoken_asset_id.clone(), s))
            .collect();
        for ((user, ctoken), entry) in &self.supplies {
            if user == user_id {
                supplies.insert(ctoken.clone(), entry.value.clone());
            }
        }

        let mut borrows: BTreeMap<String, Borrow> = self
            .store
            .list_borrows(user_id)?
            .into_iter()
            .map(|b| (b.asset_id.clone(), b))
            .collect();
        for ((user, asset), entry) in &self.borrows {
            if user == user_id {
                borrows.insert(asset.clone(), entry.value.clone());
            }
        }

        let mut markets = Vec::new();
        for supply in supplies.values().filter(|s| !s.collaterals.is_zero()) {
            let market = self
                .market_by_ctoken(&supply.ctoken_asset_id)?
                .ok_or(ErrorCode::MarketNotFound)?;
            markets.push(market);
        }
        for borrow in borrows.values().filter(|b| !b.principal.is_zero()) {
            let market = self
                .market(&borrow.asset_id)?
                .ok_or(ErrorCode::MarketNotFound)?;
            markets.push(market);
        }

        Ok(Positions {
            user_id: user_id.to_string(),
            supplies: supplies.into_values().collect(),
            borrows: borrows.into_values().collect(),
            markets,
            overrides: Vec::new(),
        })
    }

    pub fn liquidity(&self, positions: &Positions) -> Evaluation<AccountLiquidity> {
        let result = match self.pool {
            Some(pool) => liquidity::account_liquidity_on(
                pool,
                &positions.supplies,
                &positions.borrows,
                &positions.markets,
                &positions.overrides,
            ),
            None => liquidity::account_liquidity(
                &positions.supplies,
                &positions.borrows,
                &positions.markets,
                &positions.overrides,
            ),
        };
        Ok(result?)
    }

    // governance state

    fn load_proposal(&mut self, trace_id: &str) -> Result<()> {
        if self.proposals.contains_key(trace_id) {
            return Ok(());
        }
        if let Some(proposal) = self.store.find_proposal(trace_id)? {
            let version = proposal.version;
            self.proposals
                .insert(trace_id.to_string(), Entry::loaded(proposal, version));
        }
        Ok(())
    }

    pub fn proposal(&mut self, trace_id: &str) -> Result<Option<Proposal>> {
        self.load_proposal(trace_id)?;
        Ok(self.proposals.get(trace_id).map(|e| e.value.clone()))
    }

    pub fn proposal_mut(&mut self, trace_id: &str) -> Result<&mut Proposal> {
        self.load_proposal(trace_id)?;
        let entry = self
            .proposals
            .get_mut(trace_id)
            .ok_or_else(|| anyhow!("Proposal {} is not loaded", trace_id))?;
        entry.dirty = true;
        Ok(&mut entry.value)
    }

    pub fn insert_proposal(&mut self, proposal: Proposal) {
        self.proposals
            .insert(proposal.trace_id.clone(), Entry::created(proposal));
    }

    pub fn property(&self, key: &str) -> Result<Option<String>> {
        match self.properties.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.store.find_property(key),
        }
    }

    pub fn protocol_version(&self) -> Result<i64> {
        match self.property(PROPERTY_SYSTEM_VERSION)? {
            Some(value) => value
                .parse::<i64>()
                .map_err(|e| anyhow!("Invalid protocol version {}: {}", value, e)),
            None => Ok(DEFAULT_VERSION),
        }
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn add_signer(&mut self, user_id: &str, public_key: &str) {
        self.signer_changes.push(SignerChange::Add(OracleSigner {
            user_id: user_id.to_string(),
            public_key: public_key.to_string(),
            created_at: self.now(),
        }));
    }

    pub fn remove_signer(&mut self, user_id: &str) {
        self.signer_changes
            .push(SignerChange::Remove(user_id.to_string()));
    }

    pub fn change_scope(&mut self, change: ScopeChange) {
        self.scope_changes.push(change);
    }

    // transfers

    fn memo(&self, code: Option<ErrorCode>) -> String {
        let kind = self.instruction.kind.as_u16();
        match code {
            Some(code) => json!({ "t": kind, "c": code.code(), "f": self.output.trace_id }),
            None => json!({ "t": kind, "f": self.instruction.follow_id }),
        }
        .to_string()
    }

    fn push_transfer(
        &mut self,
        purpose: &str,
        opponent: &str,
        asset_id: &str,
        amount: Decimal,
        memo: String,
    ) {
        let amount = trunc8(amount);
        if amount <= Decimal::ZERO {
            return;
        }

        let trace_id = derive_trace_id(&self.output.trace_id, purpose);
        if self.transfers.iter().any(|t| t.trace_id == trace_id) {
            return;
        }

        self.transfers.push(Transfer {
            trace_id,
            output_id: self.output.id,
            opponents: vec![opponent.to_string()],
            threshold: 1,
            asset_id: asset_id.to_string(),
            amount,
            memo,
            created_at: self.output.created_at,
        });
    }

    /// Queues an outbound payment. Amounts are truncated to asset precision
    /// and dropped when nothing is left.
    pub fn transfer(&mut self, purpose: &str, opponent: &str, asset_id: &str, amount: Decimal) {
        let memo = self.memo(None);
        self.push_transfer(purpose, opponent, asset_id, amount, memo);
    }

    /// Sends the whole inbound payment back to its sender.
    pub fn return_inbound(&mut self) {
        let output = self.output;
        self.transfer(PURPOSE_RETURN, &output.sender, &output.asset_id, output.amount);
    }

    pub fn refund(&mut self, code: ErrorCode) {
        let output = self.output;
        let memo = self.memo(Some(code));
        self.push_transfer(
            PURPOSE_REFUND,
            &output.sender,
            &output.asset_id,
            output.amount,
            memo,
        );
    }

    pub fn finish(self, transaction: Option<Transaction>) -> Changeset {
        let output_id = self.output.id;

        Changeset {
            markets: versioned(self.markets.into_values(), output_id, |m, v| m.version = v),
            supplies: versioned(self.supplies.into_values(), output_id, |s, v| s.version = v),
            borrows: versioned(self.borrows.into_values(), output_id, |b, v| b.version = v),
            proposals: versioned(self.proposals.into_values(), output_id, |p, v| {
                p.version = v
            }),
            transaction,
            transfers: self.transfers,
            properties: self.properties.into_iter().collect(),
            signer_changes: self.signer_changes,
            scope_changes: self.scope_changes,
        }
    }
}
