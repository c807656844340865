pub mod borrow;
pub mod governance;
pub mod liquidate;
pub mod price;
pub mod redeem;
pub mod session;
pub mod supply;

use crate::decoder::{Decoder, Instruction};
use crate::error::{ErrorCode, Evaluation, Failure};
use crate::operation::Operation;
use crate::oracle::PriceOracle;
use crate::service::worker_pool::WorkerPool;
use crate::store::Store;
use crate::types::{
    Market, Outcome, Output, System, Transaction, TransactionData, TransactionStatus,
};

use anyhow::Result;
use session::Session;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What processing an output amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    /// The memo held no recognized instruction; nothing was written.
    Skipped,
    Applied,
    Rejected(ErrorCode),
    /// A transaction record already existed and its outcome was re-applied.
    Replayed,
}

/// Turns one output into one committed changeset.
pub struct Processor {
    system: Arc<System>,
    store: Arc<dyn Store>,
    decoder: Decoder,
    oracle: Arc<dyn PriceOracle>,
    worker_pool: Option<Arc<WorkerPool>>,
}

impl Processor {
    pub fn new(
        system: Arc<System>,
        store: Arc<dyn Store>,
        decoder: Decoder,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        Processor {
            system,
            store,
            decoder,
            oracle,
            worker_pool: None,
        }
    }

    /// Fans liquidity valuation out on `pool` instead of the calling thread.
    pub fn with_worker_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.worker_pool = Some(pool);
        self
    }

    pub fn process(&self, output: &Output) -> Result<Processed> {
        let version = self.store.protocol_version()?;
        let Some(instruction) = self.decoder.decode(&output.memo, version) else {
            debug!("Output {} carries no recognized instruction, skipped", output.id);
            return Ok(Processed::Skipped);
        };

        if let Some(transaction) = self.store.find_transaction(&output.trace_id)? {
            return self.replay(output, &instruction, transaction);
        }

        let mut session = self.session(output, &instruction);
        let evaluated = self
            .admit(&instruction, output)
            .and_then(|_| Operation::parse(instruction.kind, &instruction.params).map_err(Failure::from))
            .and_then(|operation| self.evaluate(&mut session, &operation));

        match evaluated {
            Ok(outcome) => {
                apply(&mut session, &outcome)?;
                let transaction = transaction_record(
                    output,
                    &instruction,
                    TransactionStatus::Success,
                    None,
                    Some(outcome),
                );
                self.store.commit(&session.finish(Some(transaction)))?;
                info!(
                    "Output {} applied {} for {}",
                    output.id, instruction.kind, output.sender
                );
                Ok(Processed::Applied)
            }
            Err(Failure::Rejected(code)) => {
                // Nothing evaluated so far is kept, only the refund.
                let mut session = self.session(output, &instruction);
                session.refund(code);
                let transaction = transaction_record(
                    output,
                    &instruction,
                    TransactionStatus::Rejected,
                    Some(code),
                    None,
                );
                self.store.commit(&session.finish(Some(transaction)))?;
                info!(
                    "Output {} rejected {} for {}: {}",
                    output.id, instruction.kind, output.sender, code
                );
                Ok(Processed::Rejected(code))
            }
            Err(Failure::Fatal(e)) => Err(e),
        }
    }

    /// Re-applies a recorded decision. Entity writes the first run already
    /// made are dropped by their version guard; transfers dedupe on trace id.
    fn replay(
        &self,
        output: &Output,
        instruction: &Instruction,
        transaction: Transaction,
    ) -> Result<Processed> {
        let mut session = self.session(output, instruction);
        match (transaction.status, transaction.data.outcome) {
            (TransactionStatus::Rejected, _) => {
                session.refund(transaction.error_code.unwrap_or(ErrorCode::InvalidArgument));
            }
            (TransactionStatus::Success, Some(outcome)) => apply(&mut session, &outcome)?,
            (TransactionStatus::Success, None) => {
                warn!("Transaction {} has no recorded outcome", transaction.trace_id);
            }
        }

        let changeset = session.finish(None);
        if !changeset.is_empty() {
            self.store.commit(&changeset)?;
        }
        debug!("Output {} replayed", output.id);
        Ok(Processed::Replayed)
    }

    fn session<'a>(&'a self, output: &'a Output, instruction: &'a Instruction) -> Session<'a> {
        Session::new(
            &self.system,
            self.store.as_ref(),
            output,
            instruction,
            self.worker_pool.as_deref(),
        )
    }

    /// Allow-list gate. Governance kinds are gated by committee membership
    /// instead.
    fn admit(&self, instruction: &Instruction, output: &Output) -> Evaluation<()> {
        if instruction.kind.is_governance() {
            return Ok(());
        }

        let scope = instruction.kind.scope();
        if self.store.is_scope_restricted(scope)? && !self.store.is_allowed(scope, &output.sender)? {
            return Err(ErrorCode::OperationForbidden.into());
        }
        Ok(())
    }

    fn evaluate(&self, session: &mut Session, operation: &Operation) -> Evaluation<Outcome> {
        match operation {
            Operation::Supply => supply::evaluate_supply(session),
            Operation::Pledge => supply::evaluate_pledge(session),
            Operation::QuickPledge => supply::evaluate_quick_pledge(session),
            Operation::Redeem => redeem::evaluate_redeem(session),
            Operation::Unpledge(params) => redeem::evaluate_unpledge(session, params),
            Operation::QuickRedeem(params) => redeem::evaluate_quick_redeem(session, params),
            Operation::Borrow(params) => borrow::evaluate_borrow(session, params),
            Operation::Repay => borrow::evaluate_repay(session),
            Operation::QuickBorrow(params) => borrow::evaluate_quick_borrow(session, params),
            Operation::Liquidate(params) => liquidate::evaluate(session, params),
            Operation::ProvidePrice(attestation) => {
                price::evaluate(session, attestation, self.oracle.as_ref())
            }
            Operation::ProposalMake(action) => governance::evaluate_make(session, action),
            Operation::ProposalVote(params) => governance::evaluate_vote(session, params),
        }
    }
}

fn apply(session: &mut Session, outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Supply { ctokens } => supply::apply_supply(session, *ctokens),
        Outcome::Pledge { ctokens } => supply::apply_pledge(session, *ctokens),
        Outcome::QuickPledge { ctokens } => supply::apply_quick_pledge(session, *ctokens),
        Outcome::Redeem { ctokens, amount } => redeem::apply_redeem(session, *ctokens, *amount),
        Outcome::Unpledge {
            ctoken_asset_id,
            ctokens,
        } => redeem::apply_unpledge(session, ctoken_asset_id, *ctokens),
        Outcome::QuickRedeem {
            ctoken_asset_id,
            ctokens,
            amount,
        } => redeem::apply_quick_redeem(session, ctoken_asset_id, *ctokens, *amount),
        Outcome::Borrow { asset_id, amount } => borrow::apply_borrow(session, asset_id, *amount),
        Outcome::Repay { repaid, change } => borrow::apply_repay(session, *repaid, *change),
        Outcome::QuickBorrow {
            supply_asset_id,
            supplied,
            ctokens,
            borrow_asset_id,
            amount,
        } => borrow::apply_quick_borrow(
            session,
            supply_asset_id,
            *supplied,
            *ctokens,
            borrow_asset_id,
            *amount,
        ),
        Outcome::Liquidate {
            user_id,
            ctoken_asset_id,
            seized_ctokens,
            repaid,
            change,
        } => liquidate::apply(
            session,
            user_id,
            ctoken_asset_id,
            *seized_ctokens,
            *repaid,
            *change,
        ),
        Outcome::ProvidePrice {
            asset_id,
            price,
            timestamp,
        } => price::apply(session, asset_id, *price, *timestamp),
        Outcome::ProposalMake { action, content } => {
            governance::apply_make(session, *action, content)
        }
        Outcome::ProposalVote { trace_id } => governance::apply_vote(session, trace_id),
    }
}

fn transaction_record(
    output: &Output,
    instruction: &Instruction,
    status: TransactionStatus,
    error_code: Option<ErrorCode>,
    outcome: Option<Outcome>,
) -> Transaction {
    Transaction {
        trace_id: output.trace_id.clone(),
        output_id: output.id,
        user_id: output.sender.clone(),
        action: instruction.kind,
        status,
        error_code,
        data: TransactionData {
            follow_id: instruction.follow_id.clone(),
            outcome,
        },
        created_at: output.created_at,
    }
}

/// The market for `asset_id`, which must exist and accept new positions.
pub(crate) fn open_market(session: &mut Session, asset_id: &str) -> Evaluation<Market> {
    let market = session
        .market(asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    if !market.is_open() {
        return Err(ErrorCode::MarketClosed.into());
    }
    Ok(market)
}

/// The market whose ctoken is `ctoken_asset_id`, which must be open.
pub(crate) fn open_market_by_ctoken(
    session: &mut Session,
    ctoken_asset_id: &str,
) -> Evaluation<Market> {
    let market = session
        .market_by_ctoken(ctoken_asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    if !market.is_open() {
        return Err(ErrorCode::MarketClosed.into());
    }
    Ok(market)
}
