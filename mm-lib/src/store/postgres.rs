use super::{Changeset, ScopeChange, SignerChange, Store, Versioned};
use crate::error::ErrorCode;
use crate::operation::{AdminKind, OperationKind};
use crate::syncer::EventSource;
use crate::types::{
    Borrow, Market, MarketStatus, OracleSigner, Output, Proposal, Supply, Transaction,
    TransactionData, TransactionStatus, Transfer,
};
use crate::utils::{format_decimal, naive_to_utc, parse_decimal};

use db::models::{
    allow_list::NewAllowList,
    borrow::{self as borrow_model, NewBorrow, UpdateBorrow},
    market::{self as market_model, NewMarket, UpdateMarket},
    oracle_signer::{self as oracle_signer_model, NewOracleSigner},
    output as output_model,
    proposal::{self as proposal_model, NewProposal, UpdateProposal},
    supply::{self as supply_model, NewSupply, UpdateSupply},
    transaction::{self as transaction_model, NewTransaction},
    transfer::{self as transfer_model, NewTransfer},
};
use db::repositories::{
    allow_list::AllowListRepositoryImpl, borrow::BorrowRepositoryImpl,
    market::MarketRepositoryImpl, oracle_signer::OracleSignerRepositoryImpl,
    output::OutputRepositoryImpl, property::PropertyRepositoryImpl,
    proposal::ProposalRepositoryImpl, supply::SupplyRepositoryImpl,
    transaction::TransactionRepositoryImpl, transfer::TransferRepositoryImpl,
    AllowListRepository, BorrowRepository, MarketRepository, OracleSignerRepository,
    OutputRepository, PropertyRepository, ProposalRepository, SupplyRepository,
    TransactionRepository, TransferRepository,
};
use db::{run_in_transaction, DbPool};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Every repository the engine reads or writes, behind their traits.
#[derive(Clone)]
pub struct Repositories {
    pub market: Arc<dyn MarketRepository + Send + Sync>,
    pub supply: Arc<dyn SupplyRepository + Send + Sync>,
    pub borrow: Arc<dyn BorrowRepository + Send + Sync>,
    pub proposal: Arc<dyn ProposalRepository + Send + Sync>,
    pub transaction: Arc<dyn TransactionRepository + Send + Sync>,
    pub transfer: Arc<dyn TransferRepository + Send + Sync>,
    pub output: Arc<dyn OutputRepository + Send + Sync>,
    pub property: Arc<dyn PropertyRepository + Send + Sync>,
    pub oracle_signer: Arc<dyn OracleSignerRepository + Send + Sync>,
    pub allow_list: Arc<dyn AllowListRepository + Send + Sync>,
}

impl Repositories {
    pub fn new(db_pool: &DbPool) -> Self {
        Repositories {
            market: Arc::new(MarketRepositoryImpl::new(db_pool.clone())),
            supply: Arc::new(SupplyRepositoryImpl::new(db_pool.clone())),
            borrow: Arc::new(BorrowRepositoryImpl::new(db_pool.clone())),
            proposal: Arc::new(ProposalRepositoryImpl::new(db_pool.clone())),
            transaction: Arc::new(TransactionRepositoryImpl::new(db_pool.clone())),
            transfer: Arc::new(TransferRepositoryImpl::new(db_pool.clone())),
            output: Arc::new(OutputRepositoryImpl::new(db_pool.clone())),
            property: Arc::new(PropertyRepositoryImpl::new(db_pool.clone())),
            oracle_signer: Arc::new(OracleSignerRepositoryImpl::new(db_pool.clone())),
            allow_list: Arc::new(AllowListRepositoryImpl::new(db_pool.clone())),
        }
    }
}

pub struct PgStore {
    db_pool: DbPool,
    repos: Repositories,
}

impl PgStore {
    pub fn new(db_pool: DbPool, repos: Repositories) -> Self {
        PgStore { db_pool, repos }
    }
}

// model -> domain

fn to_market(m: market_model::Market) -> Result<Market> {
    Ok(Market {
        total_cash: parse_decimal(&m.total_cash)?,
        total_borrows: parse_decimal(&m.total_borrows)?,
        reserves: parse_decimal(&m.reserves)?,
        ctokens: parse_decimal(&m.ctokens)?,
        init_exchange_rate: parse_decimal(&m.init_exchange_rate)?,
        reserve_factor: parse_decimal(&m.reserve_factor)?,
        liquidation_incentive: parse_decimal(&m.liquidation_incentive)?,
        borrow_cap: parse_decimal(&m.borrow_cap)?,
        collateral_factor: parse_decimal(&m.collateral_factor)?,
        close_factor: parse_decimal(&m.close_factor)?,
        base_rate: parse_decimal(&m.base_rate)?,
        multiplier: parse_decimal(&m.multiplier)?,
        jump_multiplier: parse_decimal(&m.jump_multiplier)?,
        kink: parse_decimal(&m.kink)?,
        block_number: m.block_number,
        utilization_rate: parse_decimal(&m.utilization_rate)?,
        exchange_rate: parse_decimal(&m.exchange_rate)?,
        supply_rate_per_block: parse_decimal(&m.supply_rate_per_block)?,
        borrow_rate_per_block: parse_decimal(&m.borrow_rate_per_block)?,
        price: parse_decimal(&m.price)?,
        price_updated_at: m.price_updated_at.map(naive_to_utc),
        borrow_index: parse_decimal(&m.borrow_index)?,
        status: MarketStatus::from_i32(m.status),
        version: m.version,
        symbol: m.symbol,
        asset_id: m.asset_id,
        ctoken_asset_id: m.ctoken_asset_id,
    })
}

fn to_supply(s: supply_model::Supply) -> Result<Supply> {
    Ok(Supply {
        collaterals: parse_decimal(&s.collaterals)?,
        version: s.version,
        user_id: s.user_id,
        ctoken_asset_id: s.ctoken_asset_id,
    })
}

fn to_borrow(b: borrow_model::Borrow) -> Result<Borrow> {
    Ok(Borrow {
        principal: parse_decimal(&b.principal)?,
        interest_index: parse_decimal(&b.interest_index)?,
        version: b.version,
        user_id: b.user_id,
        asset_id: b.asset_id,
    })
}

fn to_transaction(t: transaction_model::Transaction) -> Result<Transaction> {
    let action = u16::try_from(t.action)
        .ok()
        .and_then(OperationKind::from_u16)
        .ok_or_else(|| anyhow!("Transaction {} has unknown action {}", t.trace_id, t.action))?;
    let data: TransactionData = serde_json::from_value(t.data)
        .map_err(|e| anyhow!("Transaction {} has malformed data: {}", t.trace_id, e))?;

    Ok(Transaction {
        output_id: t.output_id,
        user_id: t.user_id,
        action,
        status: TransactionStatus::from_i32(t.status),
        error_code: t.error_code.and_then(ErrorCode::from_code),
        data,
        created_at: naive_to_utc(t.created_at),
        trace_id: t.trace_id,
    })
}

fn to_proposal(p: proposal_model::Proposal) -> Result<Proposal> {
    let action = u16::try_from(p.action)
        .ok()
        .and_then(AdminKind::from_u16)
        .ok_or_else(|| anyhow!("Proposal {} has unknown action {}", p.trace_id, p.action))?;
    let votes: Vec<String> = serde_json::from_value(p.votes)
        .map_err(|e| anyhow!("Proposal {} has malformed votes: {}", p.trace_id, e))?;

    Ok(Proposal {
        creator: p.creator,
        action,
        content: p.content,
        votes,
        passed_at: p.passed_at.map(naive_to_utc),
        applied_at: p.applied_at.map(naive_to_utc),
        version: p.version,
        created_at: p.created_at.map(naive_to_utc).unwrap_or_default(),
        trace_id: p.trace_id,
    })
}

fn to_transfer(t: transfer_model::Transfer) -> Result<Transfer> {
    let opponents: Vec<String> = serde_json::from_value(t.opponents)
        .map_err(|e| anyhow!("Transfer {} has malformed opponents: {}", t.trace_id, e))?;

    Ok(Transfer {
        output_id: t.output_id,
        opponents,
        threshold: t.threshold,
        amount: parse_decimal(&t.amount)?,
        memo: t.memo,
        created_at: naive_to_utc(t.created_at),
        asset_id: t.asset_id,
        trace_id: t.trace_id,
    })
}

fn to_output(o: output_model::Output) -> Result<Output> {
    Ok(Output {
        id: o.id,
        amount: parse_decimal(&o.amount)?,
        created_at: naive_to_utc(o.created_at),
        trace_id: o.trace_id,
        sender: o.sender,
        asset_id: o.asset_id,
        memo: o.memo,
    })
}

fn to_oracle_signer(s: oracle_signer_model::OracleSigner) -> OracleSigner {
    OracleSigner {
        user_id: s.user_id,
        public_key: s.public_key,
        created_at: s.created_at.map(naive_to_utc).unwrap_or_default(),
    }
}

// domain -> model

fn new_market(m: &Market) -> NewMarket {
    NewMarket {
        symbol: m.symbol.clone(),
        asset_id: m.asset_id.clone(),
        ctoken_asset_id: m.ctoken_asset_id.clone(),
        total_cash: format_decimal(m.total_cash),
        total_borrows: format_decimal(m.total_borrows),
        reserves: format_decimal(m.reserves),
        ctokens: format_decimal(m.ctokens),
        init_exchange_rate: format_decimal(m.init_exchange_rate),
        reserve_factor: format_decimal(m.reserve_factor),
        liquidation_incentive: format_decimal(m.liquidation_incentive),
        borrow_cap: format_decimal(m.borrow_cap),
        collateral_factor: format_decimal(m.collateral_factor),
        close_factor: format_decimal(m.close_factor),
        base_rate: format_decimal(m.base_rate),
        multiplier: format_decimal(m.multiplier),
        jump_multiplier: format_decimal(m.jump_multiplier),
        kink: format_decimal(m.kink),
        block_number: m.block_number,
        utilization_rate: format_decimal(m.utilization_rate),
        exchange_rate: format_decimal(m.exchange_rate),
        supply_rate_per_block: format_decimal(m.supply_rate_per_block),
        borrow_rate_per_block: format_decimal(m.borrow_rate_per_block),
        price: format_decimal(m.price),
        price_updated_at: m.price_updated_at.map(|t| t.naive_utc()),
        borrow_index: format_decimal(m.borrow_index),
        status: m.status.as_i32(),
        version: m.version,
    }
}

fn update_market(m: &Market) -> UpdateMarket {
    let row = new_market(m);
    UpdateMarket {
        symbol: row.symbol,
        ctoken_asset_id: row.ctoken_asset_id,
        total_cash: row.total_cash,
        total_borrows: row.total_borrows,
        reserves: row.reserves,
        ctokens: row.ctokens,
        init_exchange_rate: row.init_exchange_rate,
        reserve_factor: row.reserve_factor,
        liquidation_incentive: row.liquidation_incentive,
        borrow_cap: row.borrow_cap,
        collateral_factor: row.collateral_factor,
        close_factor: row.close_factor,
        base_rate: row.base_rate,
        multiplier: row.multiplier,
        jump_multiplier: row.jump_multiplier,
        kink: row.kink,
        block_number: row.block_number,
        utilization_rate: row.utilization_rate,
        exchange_rate: row.exchange_rate,
        supply_rate_per_block: row.supply_rate_per_block,
        borrow_rate_per_block: row.borrow_rate_per_block,
        price: row.price,
        price_updated_at: row.price_updated_at,
        borrow_index: row.borrow_index,
        status: row.status,
        version: row.version,
        updated_at: Some(Utc::now().naive_utc()),
    }
}

fn new_transaction(t: &Transaction) -> Result<NewTransaction> {
    let data = serde_json::to_value(&t.data)
        .map_err(|e| anyhow!("Failed to encode transaction {}: {}", t.trace_id, e))?;

    Ok(NewTransaction {
        trace_id: t.trace_id.clone(),
        output_id: t.output_id,
        user_id: t.user_id.clone(),
        action: i32::from(t.action.as_u16()),
        status: t.status.as_i32(),
        error_code: t.error_code.map(ErrorCode::code),
        data,
        created_at: t.created_at.naive_utc(),
    })
}

fn new_transfer(t: &Transfer) -> NewTransfer {
    NewTransfer {
        trace_id: t.trace_id.clone(),
        output_id: t.output_id,
        opponents: Value::from(t.opponents.clone()),
        threshold: t.threshold,
        asset_id: t.asset_id.clone(),
        amount: format_decimal(t.amount),
        memo: t.memo.clone(),
        created_at: t.created_at.naive_utc(),
    }
}

impl Store for PgStore {
    fn find_market(&self, asset_id: &str) -> Result<Option<Market>> {
        self.repos
            .market
            .find_by_asset_id(asset_id)
            .map_err(|e| anyhow!("Failed to find market {}: {}", asset_id, e))?
            .map(to_market)
            .transpose()
    }

    fn find_market_by_ctoken(&self, ctoken_asset_id: &str) -> Result<Option<Market>> {
        self.repos
            .market
            .find_by_ctoken_asset_id(ctoken_asset_id)
            .map_err(|e| anyhow!("Failed to find market by ctoken {}: {}", ctoken_asset_id, e))?
            .map(to_market)
            .transpose()
    }

    fn list_markets(&self) -> Result<Vec<Market>> {
        self.repos
            .market
            .find_all()
            .map_err(|e| anyhow!("Failed to list markets: {}", e))?
            .into_iter()
            .map(to_market)
            .collect()
    }

    fn find_supply(&self, user_id: &str, ctoken_asset_id: &str) -> Result<Option<Supply>> {
        self.repos
            .supply
            .find(user_id, ctoken_asset_id)
            .map_err(|e| anyhow!("Failed to find supply {}/{}: {}", user_id, ctoken_asset_id, e))?
            .map(to_supply)
            .transpose()
    }

    fn list_supplies(&self, user_id: &str) -> Result<Vec<Supply>> {
        self.repos
            .supply
            .find_by_user(user_id)
            .map_err(|e| anyhow!("Failed to list supplies of {}: {}", user_id, e))?
            .into_iter()
            .map(to_supply)
            .collect()
    }

    fn find_borrow(&self, user_id: &str, asset_id: &str) -> Result<Option<Borrow>> {
        self.repos
            .borrow
            .find(user_id, asset_id)
            .map_err(|e| anyhow!("Failed to find borrow {}/{}: {}", user_id, asset_id, e))?
            .map(to_borrow)
            .transpose()
    }

    fn list_borrows(&self, user_id: &str) -> Result<Vec<Borrow>> {
        self.repos
            .borrow
            .find_by_user(user_id)
            .map_err(|e| anyhow!("Failed to list borrows of {}: {}", user_id, e))?
            .into_iter()
            .map(to_borrow)
            .collect()
    }

    fn list_all_borrows(&self) -> Result<Vec<Borrow>> {
        self.repos
            .borrow
            .find_all()
            .map_err(|e| anyhow!("Failed to list borrows: {}", e))?
            .into_iter()
            .map(to_borrow)
            .collect()
    }

    fn list_borrowers(&self) -> Result<Vec<String>> {
        self.repos
            .borrow
            .find_distinct_users()
            .map_err(|e| anyhow!("Failed to list borrowers: {}", e))
    }

    fn find_transaction(&self, trace_id: &str) -> Result<Option<Transaction>> {
        self.repos
            .transaction
            .find_by_trace_id(trace_id)
            .map_err(|e| anyhow!("Failed to find transaction {}: {}", trace_id, e))?
            .map(to_transaction)
            .transpose()
    }

    fn find_proposal(&self, trace_id: &str) -> Result<Option<Proposal>> {
        self.repos
            .proposal
            .find_by_trace_id(trace_id)
            .map_err(|e| anyhow!("Failed to find proposal {}: {}", trace_id, e))?
            .map(to_proposal)
            .transpose()
    }

    fn list_transfers(&self, output_id: i64) -> Result<Vec<Transfer>> {
        self.repos
            .transfer
            .find_by_output_id(output_id)
            .map_err(|e| anyhow!("Failed to list transfers of output {}: {}", output_id, e))?
            .into_iter()
            .map(to_transfer)
            .collect()
    }

    fn list_oracle_signers(&self) -> Result<Vec<OracleSigner>> {
        Ok(self
            .repos
            .oracle_signer
            .find_all()
            .map_err(|e| anyhow!("Failed to list oracle signers: {}", e))?
            .into_iter()
            .map(to_oracle_signer)
            .collect())
    }

    fn is_scope_restricted(&self, scope: &str) -> Result<bool> {
        let count = self
            .repos
            .allow_list
            .count_by_scope(scope)
            .map_err(|e| anyhow!("Failed to count allow list {}: {}", scope, e))?;
        Ok(count > 0)
    }

    fn is_allowed(&self, scope: &str, user_id: &str) -> Result<bool> {
        let entry = self
            .repos
            .allow_list
            .find(scope, user_id)
            .map_err(|e| anyhow!("Failed to find allow list {}/{}: {}", scope, user_id, e))?;
        Ok(entry.is_some())
    }

    fn find_property(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .repos
            .property
            .find(key)
            .map_err(|e| anyhow!("Failed to find property {}: {}", key, e))?
            .map(|p| p.value))
    }

    fn save_property(&self, key: &str, value: &str) -> Result<()> {
        run_in_transaction(&self.db_pool, |conn| {
            self.repos.property.save(conn, key, value)
        })
        .map_err(|e| anyhow!("Failed to save property {}: {}", key, e))
    }

    fn commit(&self, changeset: &Changeset) -> Result<()> {
        let now = Some(Utc::now().naive_utc());
        let transaction = changeset.transaction.as_ref().map(new_transaction).transpose()?;
        let transfers: Vec<NewTransfer> = changeset.transfers.iter().map(new_transfer).collect();
        let proposals = changeset
            .proposals
            .iter()
            .map(|write| {
                let votes = serde_json::to_value(&write.value.votes)
                    .map_err(|e| anyhow!("Failed to encode votes: {}", e))?;
                Ok((write, votes))
            })
            .collect::<Result<Vec<(&Versioned<Proposal>, Value)>>>()?;

        let repos = &self.repos;
        run_in_transaction(&self.db_pool, |conn| {
            for write in &changeset.markets {
                let m = &write.value;
                let applied = match write.expected_version {
                    None => repos.market.create(conn, &new_market(m))?,
                    Some(expected) => {
                        repos
                            .market
                            .update_if_version(conn, &m.asset_id, &update_market(m), expected)?
                    }
                };
                if !applied {
                    debug!("market {} write skipped at version {}", m.asset_id, m.version);
                }
            }

            for write in &changeset.supplies {
                let s = &write.value;
                let collaterals = format_decimal(s.collaterals);
                match write.expected_version {
                    None => {
                        repos.supply.create(
                            conn,
                            &NewSupply {
                                user_id: s.user_id.clone(),
                                ctoken_asset_id: s.ctoken_asset_id.clone(),
                                collaterals,
                                version: s.version,
                            },
                        )?;
                    }
                    Some(expected) => {
                        repos.supply.update_if_version(
                            conn,
                            &s.user_id,
                            &s.ctoken_asset_id,
                            &UpdateSupply {
                                collaterals,
                                version: s.version,
                                updated_at: now,
                            },
                            expected,
                        )?;
                    }
                }
            }

            for write in &changeset.borrows {
                let b = &write.value;
                let principal = format_decimal(b.principal);
                let interest_index = format_decimal(b.interest_index);
                match write.expected_version {
                    None => {
                        repos.borrow.create(
                            conn,
                            &NewBorrow {
                                user_id: b.user_id.clone(),
                                asset_id: b.asset_id.clone(),
                                principal,
                                interest_index,
                                version: b.version,
                            },
                        )?;
                    }
                    Some(expected) => {
                        repos.borrow.update_if_version(
                            conn,
                            &b.user_id,
                            &b.asset_id,
                            &UpdateBorrow {
                                principal,
                                interest_index,
                                version: b.version,
                                updated_at: now,
                            },
                            expected,
                        )?;
                    }
                }
            }

            for (write, votes) in &proposals {
                let p = &write.value;
                match write.expected_version {
                    None => {
                        repos.proposal.create(
                            conn,
                            &NewProposal {
                                trace_id: p.trace_id.clone(),
                                creator: p.creator.clone(),
                                action: i32::from(p.action.as_u16()),
                                content: p.content.clone(),
                                votes: votes.clone(),
                                passed_at: p.passed_at.map(|t| t.naive_utc()),
                                applied_at: p.applied_at.map(|t| t.naive_utc()),
                                version: p.version,
                                created_at: Some(p.created_at.naive_utc()),
                            },
                        )?;
                    }
                    Some(expected) => {
                        repos.proposal.update_if_version(
                            conn,
                            &p.trace_id,
                            &UpdateProposal {
                                votes: votes.clone(),
                                passed_at: p.passed_at.map(|t| t.naive_utc()),
                                applied_at: p.applied_at.map(|t| t.naive_utc()),
                                version: p.version,
                                updated_at: now,
                            },
                            expected,
                        )?;
                    }
                }
            }

            if let Some(transaction) = &transaction {
                repos.transaction.create(conn, transaction)?;
            }

            repos.transfer.create_transfers(conn, &transfers)?;

            for (key, value) in &changeset.properties {
                repos.property.save(conn, key, value)?;
            }

            for change in &changeset.signer_changes {
                match change {
                    SignerChange::Add(signer) => {
                        repos.oracle_signer.create(
                            conn,
                            &NewOracleSigner {
                                user_id: signer.user_id.clone(),
                                public_key: signer.public_key.clone(),
                                created_at: Some(signer.created_at.naive_utc()),
                            },
                        )?;
                    }
                    SignerChange::Remove(user_id) => {
                        repos.oracle_signer.delete(conn, user_id)?;
                    }
                }
            }

            for change in &changeset.scope_changes {
                match change {
                    ScopeChange::Add { scope, user_id } => {
                        repos.allow_list.create(
                            conn,
                            &NewAllowList {
                                scope: scope.clone(),
                                user_id: user_id.clone(),
                                created_at: now,
                            },
                        )?;
                    }
                    ScopeChange::Remove { scope, user_id } => {
                        repos.allow_list.delete(conn, scope, user_id)?;
                    }
                }
            }

            Ok(())
        })
        .map_err(|e| anyhow!("Failed to commit changeset: {}", e))
    }
}

#[async_trait]
impl EventSource for PgStore {
    async fn list(&self, after: i64, limit: i64) -> Result<Vec<Output>> {
        self.repos
            .output
            .list_after(after, limit)
            .map_err(|e| anyhow!("Failed to list outputs after {}: {}", after, e))?
            .into_iter()
            .map(to_output)
            .collect()
    }
}
