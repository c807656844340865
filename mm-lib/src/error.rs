use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol rejection reasons. A rejection is an ordinary result of
/// evaluating an instruction: the inbound funds are refunded with this code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    MarketNotFound,
    SupplyNotFound,
    BorrowNotFound,
    InvalidArgument,
    InvalidAmount,
    InsufficientCollaterals,
    InsufficientLiquidity,
    RedeemNotAllowed,
    BorrowNotAllowed,
    PledgeNotAllowed,
    SeizeNotAllowed,
    MarketClosed,
    OperationForbidden,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::MarketNotFound,
        ErrorCode::SupplyNotFound,
        ErrorCode::BorrowNotFound,
        ErrorCode::InvalidArgument,
        ErrorCode::InvalidAmount,
        ErrorCode::InsufficientCollaterals,
        ErrorCode::InsufficientLiquidity,
        ErrorCode::RedeemNotAllowed,
        ErrorCode::BorrowNotAllowed,
        ErrorCode::PledgeNotAllowed,
        ErrorCode::SeizeNotAllowed,
        ErrorCode::MarketClosed,
        ErrorCode::OperationForbidden,
    ];

    pub fn code(self) -> i32 {
        match self {
            ErrorCode::MarketNotFound => 10001,
            ErrorCode::SupplyNotFound => 10002,
            ErrorCode::BorrowNotFound => 10003,
            ErrorCode::InvalidArgument => 10004,
            ErrorCode::InvalidAmount => 10005,
            ErrorCode::InsufficientCollaterals => 10006,
            ErrorCode::InsufficientLiquidity => 10007,
            ErrorCode::RedeemNotAllowed => 10008,
            ErrorCode::BorrowNotAllowed => 10009,
            ErrorCode::PledgeNotAllowed => 10010,
            ErrorCode::SeizeNotAllowed => 10011,
            ErrorCode::MarketClosed => 10012,
            ErrorCode::OperationForbidden => 10013,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::MarketNotFound => "market not found",
            ErrorCode::SupplyNotFound => "supply not found",
            ErrorCode::BorrowNotFound => "borrow not found",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::InvalidAmount => "invalid amount",
            ErrorCode::InsufficientCollaterals => "insufficient collaterals",
            ErrorCode::InsufficientLiquidity => "insufficient liquidity",
            ErrorCode::RedeemNotAllowed => "redeem not allowed",
            ErrorCode::BorrowNotAllowed => "borrow not allowed",
            ErrorCode::PledgeNotAllowed => "pledge not allowed",
            ErrorCode::SeizeNotAllowed => "seize not allowed",
            ErrorCode::MarketClosed => "market closed",
            ErrorCode::OperationForbidden => "operation forbidden",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Why evaluating an instruction stopped: either a protocol rejection that is
/// refunded, or an infrastructure failure that aborts the sync cycle.
#[derive(Debug)]
pub enum Failure {
    Rejected(ErrorCode),
    Fatal(anyhow::Error),
}

impl From<ErrorCode> for Failure {
    fn from(code: ErrorCode) -> Self {
        Failure::Rejected(code)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Fatal(e)
    }
}

pub type Evaluation<T> = std::result::Result<T, Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_round_trip() {
        let mut seen = std::collections::HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()));
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(42), None);
    }

    #[test]
    fn display_carries_numeric_code() {
        assert_eq!(
            ErrorCode::InsufficientLiquidity.to_string(),
            "insufficient liquidity (10007)"
        );
    }
}
