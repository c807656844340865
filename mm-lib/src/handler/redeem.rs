use super::session::Session;
use crate::constant::{PURPOSE_REDEEM, PURPOSE_UNPLEDGE};
use crate::error::{ErrorCode, Evaluation};
use crate::operation::WithdrawParams;
use crate::types::{Market, Outcome};
use crate::utils::trunc8;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

/// Underlying paid out for burning `ctokens`.
pub(crate) fn redeem_amount(market: &Market, ctokens: Decimal) -> Result<Decimal, ErrorCode> {
    if ctokens <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    if ctokens > market.ctokens {
        return Err(ErrorCode::RedeemNotAllowed);
    }
    let amount = trunc8(ctokens * market.exchange_rate);
    if amount <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    if market.available_cash() < amount {
        return Err(ErrorCode::RedeemNotAllowed);
    }
    Ok(amount)
}

fn burn(session: &mut Session, asset_id: &str, ctokens: Decimal, amount: Decimal) -> Result<()> {
    let market = session.market_mut(asset_id)?;
    market.total_cash -= amount;
    market.ctokens -= ctokens;
    market.refresh_snapshot();
    Ok(())
}

fn underlying_of(session: &mut Session, ctoken_asset_id: &str) -> Result<String> {
    session
        .market_by_ctoken(ctoken_asset_id)?
        .map(|m| m.asset_id)
        .ok_or_else(|| anyhow!("No market for ctoken {}", ctoken_asset_id))
}

/// Checks that `user_id` can release `ctokens` of collateral and stay
/// solvent afterwards.
fn check_unpledge(
    session: &mut Session,
    user_id: &str,
    ctoken_asset_id: &str,
    ctokens: Decimal,
) -> Evaluation<()> {
    let supply = session
        .supply(user_id, ctoken_asset_id)?
        .ok_or(ErrorCode::SupplyNotFound)?;
    if ctokens > supply.collaterals {
        return Err(ErrorCode::InsufficientCollaterals.into());
    }

    let mut positions = session.positions(user_id)?;
    positions.adjust_collaterals(ctoken_asset_id, -ctokens);
    if session.liquidity(&positions)?.liquidity < Decimal::ZERO {
        return Err(ErrorCode::InsufficientLiquidity.into());
    }
    Ok(())
}

fn withdraw_amount(params: &WithdrawParams) -> Result<Decimal, ErrorCode> {
    let ctokens = trunc8(params.amount);
    if ctokens <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    Ok(ctokens)
}

pub fn evaluate_redeem(session: &mut Session) -> Evaluation<Outcome> {
    let output = session.output();
    let market = session
        .market_by_ctoken(&output.asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    let amount = redeem_amount(&market, output.amount)?;
    Ok(Outcome::Redeem {
        ctokens: output.amount,
        amount,
    })
}

pub fn apply_redeem(session: &mut Session, ctokens: Decimal, amount: Decimal) -> Result<()> {
    let output = session.output();
    let asset_id = underlying_of(session, &output.asset_id)?;
    burn(session, &asset_id, ctokens, amount)?;
    session.transfer(PURPOSE_REDEEM, &output.sender, &asset_id, amount);
    Ok(())
}

pub fn evaluate_unpledge(session: &mut Session, params: &WithdrawParams) -> Evaluation<Outcome> {
    let ctokens = withdraw_amount(params)?;
    session
        .market_by_ctoken(&params.ctoken_asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    let sender = session.sender();
    check_unpledge(session, sender, &params.ctoken_asset_id, ctokens)?;
    Ok(Outcome::Unpledge {
        ctoken_asset_id: params.ctoken_asset_id.clone(),
        ctokens,
    })
}

pub fn apply_unpledge(session: &mut Session, ctoken_asset_id: &str, ctokens: Decimal) -> Result<()> {
    let sender = session.sender();
    let asset_id = underlying_of(session, ctoken_asset_id)?;
    session.market_mut(&asset_id)?;
    session.supply_mut(sender, ctoken_asset_id)?.collaterals -= ctokens;
    session.transfer(PURPOSE_UNPLEDGE, sender, ctoken_asset_id, ctokens);
    session.return_inbound();
    Ok(())
}

/// Unpledge and redeem in one step: released collateral is burned and the
/// underlying paid out. Like the other exits it works on closed markets.
pub fn evaluate_quick_redeem(session: &mut Session, params: &WithdrawParams) -> Evaluation<Outcome> {
    let ctokens = withdraw_amount(params)?;
    let market = session
        .market_by_ctoken(&params.ctoken_asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    let amount = redeem_amount(&market, ctokens)?;
    let sender = session.sender();
    check_unpledge(session, sender, &params.ctoken_asset_id, ctokens)?;
    Ok(Outcome::QuickRedeem {
        ctoken_asset_id: params.ctoken_asset_id.clone(),
        ctokens,
        amount,
    })
}

pub fn apply_quick_redeem(
    session: &mut Session,
    ctoken_asset_id: &str,
    ctokens: Decimal,
    amount: Decimal,
) -> Result<()> {
    let sender = session.sender();
    let asset_id = underlying_of(session, ctoken_asset_id)?;
    session.supply_mut(sender, ctoken_asset_id)?.collaterals -= ctokens;
    burn(session, &asset_id, ctokens, amount)?;
    session.transfer(PURPOSE_REDEEM, sender, &asset_id, amount);
    session.return_inbound();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::{dec, market};

    #[test]
    fn redeems_at_exchange_rate() {
        let mut m = market();
        m.exchange_rate = dec("1.2");
        assert_eq!(redeem_amount(&m, dec("100")).unwrap(), dec("120"));
    }

    #[test]
    fn redeem_limited_by_supply_and_cash() {
        let mut m = market();
        assert_eq!(redeem_amount(&m, dec("1500.1")), Err(ErrorCode::RedeemNotAllowed));

        m.reserves = dec("950");
        assert_eq!(redeem_amount(&m, dec("60")), Err(ErrorCode::RedeemNotAllowed));
        assert_eq!(redeem_amount(&m, dec("50")).unwrap(), dec("50"));
    }
}
