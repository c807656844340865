use mm_lib::{operation::AdminAction, store::Store};

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Subcommand;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum SystemCommands {
    #[command(about = "Show the protocol version and output checkpoint")]
    Status,

    #[command(about = "Move the output checkpoint; outputs after it are processed again")]
    SetCheckpoint {
        #[arg(long)]
        output_id: i64,
    },

    #[command(about = "Show a proposal and its decoded action")]
    Proposal {
        #[arg(long)]
        trace_id: String,
    },

    #[command(about = "Show the transaction recorded for an output and its transfers")]
    Transaction {
        #[arg(long)]
        trace_id: String,
    },
}

pub fn handle(store: Arc<dyn Store>, command: SystemCommands) -> Result<()> {
    match command {
        SystemCommands::Status => handle_status(store),
        SystemCommands::SetCheckpoint { output_id } => handle_set_checkpoint(store, output_id),
        SystemCommands::Proposal { trace_id } => handle_proposal(store, &trace_id),
        SystemCommands::Transaction { trace_id } => handle_transaction(store, &trace_id),
    }
}

//handlers
pub fn handle_status(store: Arc<dyn Store>) -> Result<()> {
    info!("Protocol version {}", store.protocol_version()?);
    info!("Output checkpoint {}", store.checkpoint()?);
    info!("Oracle signers {}", store.list_oracle_signers()?.len());
    Ok(())
}

pub fn handle_set_checkpoint(store: Arc<dyn Store>, output_id: i64) -> Result<()> {
    if output_id < 0 {
        return Err(anyhow!("Checkpoint must not be negative: {}", output_id));
    }

    let previous = store.checkpoint()?;
    store.save_checkpoint(output_id)?;
    warn!("Output checkpoint moved from {} to {}", previous, output_id);
    Ok(())
}

pub fn handle_proposal(store: Arc<dyn Store>, trace_id: &str) -> Result<()> {
    let proposal = store
        .find_proposal(trace_id)?
        .ok_or_else(|| anyhow!("Proposal {} not found", trace_id))?;

    info!("Proposal {} by {}", proposal.trace_id, proposal.creator);
    info!("  action  {:?}", proposal.action);
    info!("  votes   {:?}", proposal.votes);
    info!("  passed  {:?}", proposal.passed_at);
    info!("  applied {:?}", proposal.applied_at);

    let decoded = STANDARD
        .decode(&proposal.content)
        .map_err(|e| anyhow!("Proposal content is not base64: {}", e))?;
    match AdminAction::decode(proposal.action, &decoded) {
        Ok(action) => info!("  content {:?}", action),
        Err(code) => warn!("  content does not decode: {}", code),
    }
    Ok(())
}

pub fn handle_transaction(store: Arc<dyn Store>, trace_id: &str) -> Result<()> {
    let transaction = store
        .find_transaction(trace_id)?
        .ok_or_else(|| anyhow!("No transaction for output {}", trace_id))?;

    info!(
        "Output {} ({}) {} by {}: {:?} {:?}",
        transaction.output_id,
        transaction.trace_id,
        transaction.action,
        transaction.user_id,
        transaction.status,
        transaction.error_code,
    );
    info!("  outcome {:?}", transaction.data);

    for transfer in store.list_transfers(transaction.output_id)? {
        info!(
            "  transfer {} {} {} to {:?} memo {}",
            transfer.trace_id, transfer.amount, transfer.asset_id, transfer.opponents, transfer.memo
        );
    }
    Ok(())
}
