pub mod accrual;
pub mod liquidity;
