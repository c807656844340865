use super::session::Session;
use super::supply::{mint, mint_amount};
use super::{open_market, open_market_by_ctoken};
use crate::constant::{PURPOSE_BORROW, PURPOSE_CHANGE};
use crate::engine::liquidity::borrow_balance;
use crate::error::{ErrorCode, Evaluation};
use crate::operation::BorrowParams;
use crate::types::{AccountLiquidity, Market, Outcome};
use crate::utils::trunc8;

use anyhow::Result;
use rust_decimal::Decimal;

/// Cash the market keeps back: borrowing must leave at least `borrow_cap`
/// of non-reserve cash in place.
pub(crate) fn check_borrowable(market: &Market, amount: Decimal) -> Result<(), ErrorCode> {
    if market.price <= Decimal::ZERO {
        return Err(ErrorCode::BorrowNotAllowed);
    }
    let available = market.available_cash();
    if available < market.borrow_cap || amount > available - market.borrow_cap {
        return Err(ErrorCode::BorrowNotAllowed);
    }
    Ok(())
}

pub(crate) fn check_affordable(
    market: &Market,
    amount: Decimal,
    liquidity: &AccountLiquidity,
) -> Result<(), ErrorCode> {
    if amount * market.price > liquidity.liquidity {
        return Err(ErrorCode::InsufficientLiquidity);
    }
    Ok(())
}

/// Splits a payment against a debt of `balance` into the part that repays it
/// and the change returned. Change is kept at asset precision so the repaid
/// part absorbs any sub-unit remainder.
pub(crate) fn split_repayment(amount: Decimal, balance: Decimal) -> (Decimal, Decimal) {
    if amount <= balance {
        return (amount, Decimal::ZERO);
    }
    let change = trunc8(amount - balance);
    (amount - change, change)
}

/// Reduces a user's debt by `repaid`, clearing the position once nothing is
/// owed.
pub(crate) fn settle_debt(
    session: &mut Session,
    user_id: &str,
    asset_id: &str,
    repaid: Decimal,
) -> Result<()> {
    let market = session.market_mut(asset_id)?;
    market.total_borrows = (market.total_borrows - repaid).max(Decimal::ZERO);
    market.total_cash += repaid;
    market.refresh_snapshot();
    let market = market.clone();

    let borrow = session.borrow_mut(user_id, asset_id)?;
    let remaining = borrow_balance(borrow, &market) - repaid;
    if remaining <= Decimal::ZERO {
        borrow.principal = Decimal::ZERO;
        borrow.interest_index = Decimal::ZERO;
    } else {
        borrow.principal = remaining;
        borrow.interest_index = market.borrow_index;
    }
    Ok(())
}

fn borrow_amount(params: &BorrowParams) -> Result<Decimal, ErrorCode> {
    let amount = trunc8(params.amount);
    if amount <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    Ok(amount)
}

pub fn evaluate_borrow(session: &mut Session, params: &BorrowParams) -> Evaluation<Outcome> {
    let amount = borrow_amount(params)?;
    let market = open_market(session, &params.asset_id)?;
    check_borrowable(&market, amount)?;

    let positions = session.positions(session.sender())?;
    let liquidity = session.liquidity(&positions)?;
    check_affordable(&market, amount, &liquidity)?;

    Ok(Outcome::Borrow {
        asset_id: params.asset_id.clone(),
        amount,
    })
}

pub fn apply_borrow(session: &mut Session, asset_id: &str, amount: Decimal) -> Result<()> {
    let sender = session.sender();

    let market = session.market_mut(asset_id)?;
    market.total_borrows += amount;
    market.total_cash -= amount;
    market.refresh_snapshot();
    let market = market.clone();

    let borrow = session.borrow_mut(sender, asset_id)?;
    borrow.principal = borrow_balance(borrow, &market) + amount;
    borrow.interest_index = market.borrow_index;

    session.transfer(PURPOSE_BORROW, sender, asset_id, amount);
    session.return_inbound();
    Ok(())
}

pub fn evaluate_repay(session: &mut Session) -> Evaluation<Outcome> {
    let output = session.output();
    if output.amount <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount.into());
    }

    let market = session
        .market(&output.asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    let borrow = session
        .borrow(&output.sender, &output.asset_id)?
        .ok_or(ErrorCode::BorrowNotFound)?;
    let balance = borrow_balance(&borrow, &market);
    if balance <= Decimal::ZERO {
        return Err(ErrorCode::BorrowNotFound.into());
    }

    let (repaid, change) = split_repayment(output.amount, balance);
    Ok(Outcome::Repay { repaid, change })
}

pub fn apply_repay(session: &mut Session, repaid: Decimal, change: Decimal) -> Result<()> {
    let output = session.output();
    settle_debt(session, &output.sender, &output.asset_id, repaid)?;
    session.transfer(PURPOSE_CHANGE, &output.sender, &output.asset_id, change);
    Ok(())
}

/// Pledge the inbound payment and borrow against it in one step. The
/// payment is either underlying, supplied first, or ctokens pledged as is.
pub fn evaluate_quick_borrow(session: &mut Session, params: &BorrowParams) -> Evaluation<Outcome> {
    let output = session.output();
    let amount = borrow_amount(params)?;

    let (supply_market, supplied, ctokens) = match session.market(&output.asset_id)? {
        Some(_) => {
            let market = open_market(session, &output.asset_id)?;
            let ctokens = mint_amount(&market, output.amount)?;
            (market, output.amount, ctokens)
        }
        None => {
            let market = open_market_by_ctoken(session, &output.asset_id)?;
            if output.amount <= Decimal::ZERO {
                return Err(ErrorCode::InvalidAmount.into());
            }
            if output.amount > market.ctokens {
                return Err(ErrorCode::PledgeNotAllowed.into());
            }
            (market, Decimal::ZERO, output.amount)
        }
    };

    let mut supply_after = supply_market.clone();
    supply_after.total_cash += supplied;
    if supplied > Decimal::ZERO {
        supply_after.ctokens += ctokens;
    }
    supply_after.refresh_snapshot();

    let borrow_market = if params.asset_id == supply_market.asset_id {
        supply_after.clone()
    } else {
        open_market(session, &params.asset_id)?
    };
    check_borrowable(&borrow_market, amount)?;

    let mut positions = session.positions(output.sender.as_str())?;
    positions.adjust_collaterals(&supply_market.ctoken_asset_id, ctokens);
    positions.markets.push(supply_market.clone());
    positions.override_market(supply_after);
    let liquidity = session.liquidity(&positions)?;
    check_affordable(&borrow_market, amount, &liquidity)?;

    Ok(Outcome::QuickBorrow {
        supply_asset_id: supply_market.asset_id,
        supplied,
        ctokens,
        borrow_asset_id: params.asset_id.clone(),
        amount,
    })
}

pub fn apply_quick_borrow(
    session: &mut Session,
    supply_asset_id: &str,
    supplied: Decimal,
    ctokens: Decimal,
    borrow_asset_id: &str,
    amount: Decimal,
) -> Result<()> {
    let sender = session.sender();

    let ctoken_asset_id = if supplied > Decimal::ZERO {
        mint(session, supply_asset_id, supplied, ctokens)?
    } else {
        session.market_mut(supply_asset_id)?.ctoken_asset_id.clone()
    };
    session.supply_mut(sender, &ctoken_asset_id)?.collaterals += ctokens;

    let market = session.market_mut(borrow_asset_id)?;
    market.total_borrows += amount;
    market.total_cash -= amount;
    market.refresh_snapshot();
    let market = market.clone();

    let borrow = session.borrow_mut(sender, borrow_asset_id)?;
    borrow.principal = borrow_balance(borrow, &market) + amount;
    borrow.interest_index = market.borrow_index;

    session.transfer(PURPOSE_BORROW, sender, borrow_asset_id, amount);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::{dec, market};

    fn liquidity(value: &str) -> AccountLiquidity {
        AccountLiquidity {
            liquidity: dec(value),
            collateral_value: dec(value),
            debt_value: Decimal::ZERO,
        }
    }

    #[test]
    fn borrow_cap_keeps_cash_back() {
        let mut m = market();
        m.borrow_cap = dec("900");
        assert_eq!(check_borrowable(&m, dec("100")), Ok(()));
        assert_eq!(check_borrowable(&m, dec("100.1")), Err(ErrorCode::BorrowNotAllowed));

        m.reserves = dec("200");
        assert_eq!(check_borrowable(&m, dec("1")), Err(ErrorCode::BorrowNotAllowed));
    }

    #[test]
    fn borrow_needs_liquidity_at_price() {
        let mut m = market();
        m.price = dec("2");
        assert_eq!(check_affordable(&m, dec("50"), &liquidity("100")), Ok(()));
        assert_eq!(
            check_affordable(&m, dec("50.01"), &liquidity("100")),
            Err(ErrorCode::InsufficientLiquidity)
        );
    }

    #[test]
    fn repayment_returns_change_at_asset_precision() {
        assert_eq!(split_repayment(dec("5"), dec("10")), (dec("5"), Decimal::ZERO));

        let (repaid, change) = split_repayment(dec("12"), dec("10.0000000012345"));
        assert_eq!(change, dec("1.99999999"));
        assert_eq!(repaid, dec("10.00000001"));
        assert!(repaid >= dec("10.0000000012345"));
    }
}
