use crate::error::ErrorCode;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Instruction kinds carried on the wire as `u16` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
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
    ProvidePrice,
    ProposalMake,
    ProposalVote,
}

impl OperationKind {
    /// Kinds users submit, each gated by its own allow-list scope.
    pub const USER_KINDS: [OperationKind; 11] = [
        OperationKind::Supply,
        OperationKind::Borrow,
        OperationKind::Redeem,
        OperationKind::Repay,
        OperationKind::Pledge,
        OperationKind::Unpledge,
        OperationKind::QuickPledge,
        OperationKind::QuickBorrow,
        OperationKind::QuickRedeem,
        OperationKind::Liquidate,
        OperationKind::ProvidePrice,
    ];

    pub fn from_u16(tag: u16) -> Option<Self> {
        let kind = match tag {
            1 => OperationKind::Supply,
            2 => OperationKind::Borrow,
            3 => OperationKind::Redeem,
            4 => OperationKind::Repay,
            5 => OperationKind::Pledge,
            6 => OperationKind::Unpledge,
            7 => OperationKind::QuickPledge,
            8 => OperationKind::QuickBorrow,
            9 => OperationKind::QuickRedeem,
            10 => OperationKind::Liquidate,
            11 => OperationKind::ProvidePrice,
            100 => OperationKind::ProposalMake,
            101 => OperationKind::ProposalVote,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_u16(self) -> u16 {
        match self {
            OperationKind::Supply => 1,
            OperationKind::Borrow => 2,
            OperationKind::Redeem => 3,
            OperationKind::Repay => 4,
            OperationKind::Pledge => 5,
            OperationKind::Unpledge => 6,
            OperationKind::QuickPledge => 7,
            OperationKind::QuickBorrow => 8,
            OperationKind::QuickRedeem => 9,
            OperationKind::Liquidate => 10,
            OperationKind::ProvidePrice => 11,
            OperationKind::ProposalMake => 100,
            OperationKind::ProposalVote => 101,
        }
    }

    pub fn is_governance(self) -> bool {
        matches!(
            self,
            OperationKind::ProposalMake | OperationKind::ProposalVote
        )
    }

    /// Allow-list scope name gating this kind.
    pub fn scope(self) -> &'static str {
        match self {
            OperationKind::Supply => "supply",
            OperationKind::Borrow => "borrow",
            OperationKind::Redeem => "redeem",
            OperationKind::Repay => "repay",
            OperationKind::Pledge => "pledge",
            OperationKind::Unpledge => "unpledge",
            OperationKind::QuickPledge => "quick_pledge",
            OperationKind::QuickBorrow => "quick_borrow",
            OperationKind::QuickRedeem => "quick_redeem",
            OperationKind::Liquidate => "liquidate",
            OperationKind::ProvidePrice => "provide_price",
            OperationKind::ProposalMake => "proposal_make",
            OperationKind::ProposalVote => "proposal_vote",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scope())
    }
}

/// Governance effects a passed proposal can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminKind {
    UpsertMarket,
    OpenMarket,
    CloseMarket,
    AddOracleSigner,
    RemoveOracleSigner,
    AddScope,
    RemoveScope,
    SetProperty,
    ProvidePrice,
    WithdrawReserves,
}

impl AdminKind {
    pub fn from_u16(tag: u16) -> Option<Self> {
        let kind = match tag {
            110 => AdminKind::UpsertMarket,
            111 => AdminKind::OpenMarket,
            112 => AdminKind::CloseMarket,
            113 => AdminKind::AddOracleSigner,
            114 => AdminKind::RemoveOracleSigner,
            115 => AdminKind::AddScope,
            116 => AdminKind::RemoveScope,
            117 => AdminKind::SetProperty,
            118 => AdminKind::ProvidePrice,
            119 => AdminKind::WithdrawReserves,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_u16(self) -> u16 {
        match self {
            AdminKind::UpsertMarket => 110,
            AdminKind::OpenMarket => 111,
            AdminKind::CloseMarket => 112,
            AdminKind::AddOracleSigner => 113,
            AdminKind::RemoveOracleSigner => 114,
            AdminKind::AddScope => 115,
            AdminKind::RemoveScope => 116,
            AdminKind::SetProperty => 117,
            AdminKind::ProvidePrice => 118,
            AdminKind::WithdrawReserves => 119,
        }
    }
}

// user operation params

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowParams {
    pub asset_id: String,
    pub amount: Decimal,
}

/// Params shared by unpledge and quick redeem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawParams {
    pub ctoken_asset_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidateParams {
    pub user_id: String,
    pub ctoken_asset_id: String,
}

/// A signed price report. Signature checking is delegated to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAttestation {
    pub asset_id: String,
    pub price: Decimal,
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalParams {
    pub action: u16,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteParams {
    pub trace_id: String,
}

// admin action params

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub symbol: String,
    pub asset_id: String,
    pub ctoken_asset_id: String,
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
    pub price: Decimal,
}

impl MarketParams {
    pub fn validate(&self) -> Result<(), ErrorCode> {
        let unit = |v: Decimal| v >= Decimal::ZERO && v <= Decimal::ONE;
        let non_negative = |v: Decimal| v >= Decimal::ZERO;

        if self.symbol.is_empty()
            || self.asset_id.is_empty()
            || self.ctoken_asset_id.is_empty()
            || self.asset_id == self.ctoken_asset_id
        {
            return Err(ErrorCode::InvalidArgument);
        }

        if self.init_exchange_rate <= Decimal::ZERO
            || !unit(self.reserve_factor)
            || !unit(self.liquidation_incentive)
            || !unit(self.collateral_factor)
            || !unit(self.close_factor)
            || !unit(self.kink)
            || !non_negative(self.borrow_cap)
            || !non_negative(self.base_rate)
            || !non_negative(self.multiplier)
            || !non_negative(self.jump_multiplier)
            || !non_negative(self.price)
        {
            return Err(ErrorCode::InvalidArgument);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRef {
    pub asset_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerParams {
    pub user_id: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerRef {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeParams {
    pub scope: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyParams {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceParams {
    pub asset_id: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawReservesParams {
    pub asset_id: String,
    pub opponent: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    UpsertMarket(MarketParams),
    OpenMarket(MarketRef),
    CloseMarket(MarketRef),
    AddOracleSigner(SignerParams),
    RemoveOracleSigner(SignerRef),
    AddScope(ScopeParams),
    RemoveScope(ScopeParams),
    SetProperty(PropertyParams),
    ProvidePrice(PriceParams),
    WithdrawReserves(WithdrawReservesParams),
}

impl AdminAction {
    pub fn kind(&self) -> AdminKind {
        match self {
            AdminAction::UpsertMarket(_) => AdminKind::UpsertMarket,
            AdminAction::OpenMarket(_) => AdminKind::OpenMarket,
            AdminAction::CloseMarket(_) => AdminKind::CloseMarket,
            AdminAction::AddOracleSigner(_) => AdminKind::AddOracleSigner,
            AdminAction::RemoveOracleSigner(_) => AdminKind::RemoveOracleSigner,
            AdminAction::AddScope(_) => AdminKind::AddScope,
            AdminAction::RemoveScope(_) => AdminKind::RemoveScope,
            AdminAction::SetProperty(_) => AdminKind::SetProperty,
            AdminAction::ProvidePrice(_) => AdminKind::ProvidePrice,
            AdminAction::WithdrawReserves(_) => AdminKind::WithdrawReserves,
        }
    }

    pub fn decode(kind: AdminKind, content: &[u8]) -> Result<Self, ErrorCode> {
        let action = match kind {
            AdminKind::UpsertMarket => AdminAction::UpsertMarket(from_bcs(content)?),
            AdminKind::OpenMarket => AdminAction::OpenMarket(from_bcs(content)?),
            AdminKind::CloseMarket => AdminAction::CloseMarket(from_bcs(content)?),
            AdminKind::AddOracleSigner => AdminAction::AddOracleSigner(from_bcs(content)?),
            AdminKind::RemoveOracleSigner => AdminAction::RemoveOracleSigner(from_bcs(content)?),
            AdminKind::AddScope => AdminAction::AddScope(from_bcs(content)?),
            AdminKind::RemoveScope => AdminAction::RemoveScope(from_bcs(content)?),
            AdminKind::SetProperty => AdminAction::SetProperty(from_bcs(content)?),
            AdminKind::ProvidePrice => AdminAction::ProvidePrice(from_bcs(content)?),
            AdminKind::WithdrawReserves => AdminAction::WithdrawReserves(from_bcs(content)?),
        };
        Ok(action)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            AdminAction::UpsertMarket(p) => to_bcs(p),
            AdminAction::OpenMarket(p) | AdminAction::CloseMarket(p) => to_bcs(p),
            AdminAction::AddOracleSigner(p) => to_bcs(p),
            AdminAction::RemoveOracleSigner(p) => to_bcs(p),
            AdminAction::AddScope(p) | AdminAction::RemoveScope(p) => to_bcs(p),
            AdminAction::SetProperty(p) => to_bcs(p),
            AdminAction::ProvidePrice(p) => to_bcs(p),
            AdminAction::WithdrawReserves(p) => to_bcs(p),
        }
    }
}

/// A decoded instruction with typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Supply,
    Borrow(BorrowParams),
    Redeem,
    Repay,
    Pledge,
    Unpledge(WithdrawParams),
    QuickPledge,
    QuickBorrow(BorrowParams),
    QuickRedeem(WithdrawParams),
    Liquidate(LiquidateParams),
    ProvidePrice(PriceAttestation),
    ProposalMake(AdminAction),
    ProposalVote(VoteParams),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Supply => OperationKind::Supply,
            Operation::Borrow(_) => OperationKind::Borrow,
            Operation::Redeem => OperationKind::Redeem,
            Operation::Repay => OperationKind::Repay,
            Operation::Pledge => OperationKind::Pledge,
            Operation::Unpledge(_) => OperationKind::Unpledge,
            Operation::QuickPledge => OperationKind::QuickPledge,
            Operation::QuickBorrow(_) => OperationKind::QuickBorrow,
            Operation::QuickRedeem(_) => OperationKind::QuickRedeem,
            Operation::Liquidate(_) => OperationKind::Liquidate,
            Operation::ProvidePrice(_) => OperationKind::ProvidePrice,
            Operation::ProposalMake(_) => OperationKind::ProposalMake,
            Operation::ProposalVote(_) => OperationKind::ProposalVote,
        }
    }

    /// Parses the parameter bytes of a recognized kind. Kinds that take their
    /// input from the payment itself ignore `params`.
    pub fn parse(kind: OperationKind, params: &[u8]) -> Result<Self, ErrorCode> {
        let operation = match kind {
            OperationKind::Supply => Operation::Supply,
            OperationKind::Borrow => Operation::Borrow(from_bcs(params)?),
            OperationKind::Redeem => Operation::Redeem,
            OperationKind::Repay => Operation::Repay,
            OperationKind::Pledge => Operation::Pledge,
            OperationKind::Unpledge => Operation::Unpledge(from_bcs(params)?),
            OperationKind::QuickPledge => Operation::QuickPledge,
            OperationKind::QuickBorrow => Operation::QuickBorrow(from_bcs(params)?),
            OperationKind::QuickRedeem => Operation::QuickRedeem(from_bcs(params)?),
            OperationKind::Liquidate => Operation::Liquidate(from_bcs(params)?),
            OperationKind::ProvidePrice => Operation::ProvidePrice(from_bcs(params)?),
            OperationKind::ProposalMake => {
                let proposal: ProposalParams = from_bcs(params)?;
                let kind = AdminKind::from_u16(proposal.action).ok_or(ErrorCode::InvalidArgument)?;
                Operation::ProposalMake(AdminAction::decode(kind, &proposal.content)?)
            }
            OperationKind::ProposalVote => Operation::ProposalVote(from_bcs(params)?),
        };
        Ok(operation)
    }

    pub fn encode_params(&self) -> Result<Vec<u8>> {
        match self {
            Operation::Supply
            | Operation::Redeem
            | Operation::Repay
            | Operation::Pledge
            | Operation::QuickPledge => Ok(Vec::new()),
            Operation::Borrow(p) | Operation::QuickBorrow(p) => to_bcs(p),
            Operation::Unpledge(p) | Operation::QuickRedeem(p) => to_bcs(p),
            Operation::Liquidate(p) => to_bcs(p),
            Operation::ProvidePrice(p) => to_bcs(p),
            Operation::ProposalMake(action) => to_bcs(&ProposalParams {
                action: action.kind().as_u16(),
                content: action.encode()?,
            }),
            Operation::ProposalVote(p) => to_bcs(p),
        }
    }
}

fn from_bcs<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ErrorCode> {
    bcs::from_bytes(bytes).map_err(|_| ErrorCode::InvalidArgument)
}

fn to_bcs<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bcs::to_bytes(value).map_err(|e| anyhow!("Failed to encode params: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_tags_round_trip_and_partition() {
        for tag in (1..=11).chain([100, 101]) {
            let kind = OperationKind::from_u16(tag).unwrap();
            assert_eq!(kind.as_u16(), tag);
            assert_eq!(kind.is_governance(), tag >= 100);
        }
        assert_eq!(OperationKind::from_u16(12), None);
        assert_eq!(AdminKind::from_u16(120), None);
        assert_eq!(AdminKind::from_u16(117), Some(AdminKind::SetProperty));
    }

    #[test]
    fn parses_borrow_params() {
        let op = Operation::Borrow(BorrowParams {
            asset_id: "usdt".into(),
            amount: Decimal::from_str("12.5").unwrap(),
        });
        let bytes = op.encode_params().unwrap();

        assert_eq!(Operation::parse(OperationKind::Borrow, &bytes).unwrap(), op);
    }

    #[test]
    fn truncated_params_are_invalid_arguments() {
        let bytes = Operation::Liquidate(LiquidateParams {
            user_id: "alice".into(),
            ctoken_asset_id: "cbtc".into(),
        })
        .encode_params()
        .unwrap();

        assert_eq!(
            Operation::parse(OperationKind::Liquidate, &bytes[..bytes.len() - 2]),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn proposal_with_unknown_admin_kind_is_invalid() {
        let bytes = bcs::to_bytes(&ProposalParams {
            action: 199,
            content: vec![],
        })
        .unwrap();

        assert_eq!(
            Operation::parse(OperationKind::ProposalMake, &bytes),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn market_params_reject_out_of_range_factors() {
        let mut params = MarketParams {
            symbol: "BTC".into(),
            asset_id: "btc".into(),
            ctoken_asset_id: "cbtc".into(),
            init_exchange_rate: Decimal::ONE,
            reserve_factor: Decimal::from_str("0.1").unwrap(),
            liquidation_incentive: Decimal::from_str("0.05").unwrap(),
            borrow_cap: Decimal::ZERO,
            collateral_factor: Decimal::from_str("0.75").unwrap(),
            close_factor: Decimal::from_str("0.5").unwrap(),
            base_rate: Decimal::from_str("0.025").unwrap(),
            multiplier: Decimal::from_str("0.2").unwrap(),
            jump_multiplier: Decimal::ZERO,
            kink: Decimal::ZERO,
            price: Decimal::from(30000),
        };
        assert!(params.validate().is_ok());

        params.collateral_factor = Decimal::from_str("1.2").unwrap();
        assert_eq!(params.validate(), Err(ErrorCode::InvalidArgument));
    }
}
