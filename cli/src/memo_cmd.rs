use mm_lib::{
    constant::SUPPORTED_VERSION,
    decoder::{plain, Decoder},
    operation::{BorrowParams, LiquidateParams, Operation, VoteParams, WithdrawParams},
};

use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Clone, Copy, ValueEnum)]
pub enum MemoKind {
    Supply,
    Borrow,
    Redeem,
    Repay,
    Pledge,
    Unpledge,
    QuickPledge,
    QuickBorrow,
    QuickRedeem,
    Liquidate,
    Vote,
}

#[derive(Subcommand)]
pub enum MemoCommands {
    #[command(about = "Decode a payment memo into its instruction")]
    Decode {
        #[arg(long)]
        memo: String,

        /// Protocol version to decode under
        #[arg(long, default_value_t = SUPPORTED_VERSION)]
        version: i64,
    },

    #[command(about = "Build a plain memo for a user instruction")]
    Encode {
        #[arg(long, value_enum)]
        kind: MemoKind,

        #[arg(long, default_value = "")]
        follow_id: String,

        /// Asset id, or ctoken asset id for unpledge, quick redeem and liquidate
        #[arg(long)]
        asset: Option<String>,

        #[arg(long)]
        amount: Option<Decimal>,

        /// Account to liquidate
        #[arg(long)]
        user: Option<String>,

        /// Proposal to vote for
        #[arg(long)]
        trace_id: Option<String>,
    },
}

pub fn handle(decoder: &Decoder, command: MemoCommands) -> Result<()> {
    match command {
        MemoCommands::Decode { memo, version } => handle_decode(decoder, &memo, version),
        MemoCommands::Encode {
            kind,
            follow_id,
            asset,
            amount,
            user,
            trace_id,
        } => {
            let operation = build_operation(kind, asset, amount, user, trace_id)?;
            handle_encode(&operation, &follow_id)
        }
    }
}

//handlers
pub fn handle_decode(decoder: &Decoder, memo: &str, version: i64) -> Result<()> {
    let instruction = decoder
        .decode(memo, version)
        .ok_or_else(|| anyhow!("Memo is not a recognized instruction at version {}", version))?;

    info!("Kind      {:?}", instruction.kind);
    info!("Follow id {}", instruction.follow_id);

    match Operation::parse(instruction.kind, &instruction.params) {
        Ok(operation) => info!("Operation {:?}", operation),
        Err(code) => warn!("Params do not parse: {}", code),
    }
    Ok(())
}

pub fn handle_encode(operation: &Operation, follow_id: &str) -> Result<()> {
    let memo = plain::encode(operation.kind(), follow_id, &operation.encode_params()?)?;
    info!("Memo {}", memo);
    Ok(())
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("--{} is required for this kind", name))
}

fn build_operation(
    kind: MemoKind,
    asset: Option<String>,
    amount: Option<Decimal>,
    user: Option<String>,
    trace_id: Option<String>,
) -> Result<Operation> {
    let operation = match kind {
        MemoKind::Supply => Operation::Supply,
        MemoKind::Redeem => Operation::Redeem,
        MemoKind::Repay => Operation::Repay,
        MemoKind::Pledge => Operation::Pledge,
        MemoKind::QuickPledge => Operation::QuickPledge,
        MemoKind::Borrow | MemoKind::QuickBorrow => {
            let params = BorrowParams {
                asset_id: required(asset, "asset")?,
                amount: required(amount, "amount")?,
            };
            if matches!(kind, MemoKind::Borrow) {
                Operation::Borrow(params)
            } else {
                Operation::QuickBorrow(params)
            }
        }
        MemoKind::Unpledge | MemoKind::QuickRedeem => {
            let params = WithdrawParams {
                ctoken_asset_id: required(asset, "asset")?,
                amount: required(amount, "amount")?,
            };
            if matches!(kind, MemoKind::Unpledge) {
                Operation::Unpledge(params)
            } else {
                Operation::QuickRedeem(params)
            }
        }
        MemoKind::Liquidate => Operation::Liquidate(LiquidateParams {
            user_id: required(user, "user")?,
            ctoken_asset_id: required(asset, "asset")?,
        }),
        MemoKind::Vote => Operation::ProposalVote(VoteParams {
            trace_id: required(trace_id, "trace-id")?,
        }),
    };
    Ok(operation)
}
