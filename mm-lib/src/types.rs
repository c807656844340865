use crate::constant::{self, MARKET_STATUS_CLOSED, MARKET_STATUS_OPEN};
use crate::config::SystemConfig;
use crate::engine::accrual;
use crate::error::ErrorCode;
use crate::operation::{AdminKind, OperationKind};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The committee every node belongs to. Built once at startup and passed
/// explicitly to whatever needs membership or timing.
#[derive(Debug, Clone)]
pub struct System {
    pub members: Vec<String>,
    pub threshold: usize,
    pub genesis_time: DateTime<Utc>,
    pub legacy_version_floor: i64,
}

impl System {
    pub fn new(config: &SystemConfig) -> Self {
        System {
            members: config.distinct_members(),
            threshold: config.threshold,
            genesis_time: config.genesis_time,
            legacy_version_floor: config.legacy_version_floor,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.binary_search_by(|m| m.as_str().cmp(user_id)).is_ok()
    }

    /// Block number of a timestamp, counted from genesis. Timestamps before
    /// genesis map to block zero.
    pub fn block_at(&self, at: DateTime<Utc>) -> i64 {
        let elapsed = (at - self.genesis_time).num_seconds();
        if elapsed <= 0 {
            return 0;
        }
        elapsed / constant::SECONDS_PER_BLOCK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Open,
    Closed,
}

impl MarketStatus {
    pub fn from_i32(status: i32) -> Self {
        if status == MARKET_STATUS_CLOSED {
            MarketStatus::Closed
        } else {
            MarketStatus::Open
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            MarketStatus::Open => MARKET_STATUS_OPEN,
            MarketStatus::Closed => MARKET_STATUS_CLOSED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub asset_id: String,
    pub ctoken_asset_id: String,
    pub total_cash: Decimal,
    pub total_borrows: Decimal,
    pub reserves: Decimal,
    pub ctokens: Decimal,
    pub init_exchange_rate: Decimal,
    pub reserve_factor: Decimal,
    pub liquidation_incentive: Decimal,
    pub borrow_cap: Decimal,
    pub collateral_factor: Decimal,
    pub close_factor: Decimal,
    pub base_rate: Decimal,
    pub multiplier: Decimal,
    pub jump_multiplier: Decimal,
    pub kink: Decimal,
    pub block_number: i64,
    pub utilization_rate: Decimal,
    pub exchange_rate: Decimal,
    pub supply_rate_per_block: Decimal,
    pub borrow_rate_per_block: Decimal,
    pub price: Decimal,
    pub price_updated_at: Option<DateTime<Utc>>,
    pub borrow_index: Decimal,
    pub status: MarketStatus,
    pub version: i64,
}

impl Market {
    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    /// Cash that can leave the market without touching reserves.
    pub fn available_cash(&self) -> Decimal {
        self.total_cash - self.reserves
    }

    /// Recomputes utilization, exchange rate and per-block rates from the
    /// current totals without advancing the accrual block.
    pub fn refresh_snapshot(&mut self) {
        accrual::refresh_snapshot(self);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub user_id: String,
    pub ctoken_asset_id: String,
    pub collaterals: Decimal,
    pub version: i64,
}

impl Supply {
    pub fn empty(user_id: &str, ctoken_asset_id: &str) -> Self {
        Supply {
            user_id: user_id.to_string(),
            ctoken_asset_id: ctoken_asset_id.to_string(),
            collaterals: Decimal::ZERO,
            version: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrow {
    pub user_id: String,
    pub asset_id: String,
    pub principal: Decimal,
    pub interest_index: Decimal,
    pub version: i64,
}

impl Borrow {
    pub fn empty(user_id: &str, asset_id: &str) -> Self {
        Borrow {
            user_id: user_id.to_string(),
            asset_id: asset_id.to_string(),
            principal: Decimal::ZERO,
            interest_index: Decimal::ZERO,
            version: 0,
        }
    }
}

/// An inbound payment observed on the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub id: i64,
    pub trace_id: String,
    pub sender: String,
    pub asset_id: String,
    pub amount: Decimal,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

/// An outbound payment instruction. `trace_id` is derived from the source
/// output and a purpose, so enqueueing it twice yields one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub trace_id: String,
    pub output_id: i64,
    pub opponents: Vec<String>,
    pub threshold: i32,
    pub asset_id: String,
    pub amount: Decimal,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Rejected,
}

impl TransactionStatus {
    pub fn from_i32(status: i32) -> Self {
        if status == constant::TRANSACTION_STATUS_REJECTED {
            TransactionStatus::Rejected
        } else {
            TransactionStatus::Success
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            TransactionStatus::Success => constant::TRANSACTION_STATUS_SUCCESS,
            TransactionStatus::Rejected => constant::TRANSACTION_STATUS_REJECTED,
        }
    }
}

/// Amounts computed the first time an instruction is evaluated. Replays
/// apply these instead of re-evaluating against live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Supply {
        ctokens: Decimal,
    },
    Borrow {
        asset_id: String,
        amount: Decimal,
    },
    Redeem {
        ctokens: Decimal,
        amount: Decimal,
    },
    Repay {
        repaid: Decimal,
        change: Decimal,
    },
    Pledge {
        ctokens: Decimal,
    },
    Unpledge {
        ctoken_asset_id: String,
        ctokens: Decimal,
    },
    QuickPledge {
        ctokens: Decimal,
    },
    QuickBorrow {
        supply_asset_id: String,
        supplied: Decimal,
        ctokens: Decimal,
        borrow_asset_id: String,
        amount: Decimal,
    },
    QuickRedeem {
        ctoken_asset_id: String,
        ctokens: Decimal,
        amount: Decimal,
    },
    Liquidate {
        user_id: String,
        ctoken_asset_id: String,
        seized_ctokens: Decimal,
        repaid: Decimal,
        change: Decimal,
    },
    ProvidePrice {
        asset_id: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    ProposalMake {
        action: u16,
        content: String,
    },
    ProposalVote {
        trace_id: String,
    },
}

/// Payload stored in a transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    pub follow_id: String,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub trace_id: String,
    pub output_id: i64,
    pub user_id: String,
    pub action: OperationKind,
    pub status: TransactionStatus,
    pub error_code: Option<ErrorCode>,
    pub data: TransactionData,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub trace_id: String,
    pub creator: String,
    pub action: AdminKind,
    /// Base64 of the BCS-encoded admin parameters.
    pub content: String,
    pub votes: Vec<String>,
    pub passed_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn is_passed(&self) -> bool {
        self.passed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleSigner {
    pub user_id: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

/// Account liquidity: positive means spare borrowing power, negative means
/// the account can be liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccountLiquidity {
    pub liquidity: Decimal,
    pub collateral_value: Decimal,
    pub debt_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn system() -> System {
        System::new(&SystemConfig {
            members: vec!["m3".into(), "m1".into(), "m2".into(), "m1".into()],
            threshold: 2,
            genesis_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            legacy_version_floor: 2,
        })
    }

    #[test]
    fn membership_is_deduplicated() {
        let system = system();
        assert_eq!(system.members, vec!["m1", "m2", "m3"]);
        assert!(system.is_member("m2"));
        assert!(!system.is_member("m4"));
    }

    #[test]
    fn block_numbers_floor_elapsed_seconds() {
        let system = system();
        let genesis = system.genesis_time;

        assert_eq!(system.block_at(genesis - chrono::Duration::seconds(60)), 0);
        assert_eq!(system.block_at(genesis + chrono::Duration::seconds(14)), 0);
        assert_eq!(system.block_at(genesis + chrono::Duration::seconds(15)), 1);
        assert_eq!(system.block_at(genesis + chrono::Duration::seconds(151)), 10);
    }
}
