use super::session::Session;
use super::{open_market, open_market_by_ctoken};
use crate::constant::PURPOSE_CTOKEN;
use crate::error::{ErrorCode, Evaluation};
use crate::types::{Market, Outcome};
use crate::utils::trunc8;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

/// ctokens minted for `amount` of underlying at the current exchange rate.
pub(crate) fn mint_amount(market: &Market, amount: Decimal) -> Result<Decimal, ErrorCode> {
    if amount <= Decimal::ZERO || market.exchange_rate <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    let ctokens = trunc8(amount / market.exchange_rate);
    if ctokens <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount);
    }
    Ok(ctokens)
}

/// Adds `amount` of underlying and `ctokens` to the market totals.
pub(crate) fn mint(
    session: &mut Session,
    asset_id: &str,
    amount: Decimal,
    ctokens: Decimal,
) -> Result<String> {
    let market = session.market_mut(asset_id)?;
    market.total_cash += amount;
    market.ctokens += ctokens;
    market.refresh_snapshot();
    Ok(market.ctoken_asset_id.clone())
}

pub fn evaluate_supply(session: &mut Session) -> Evaluation<Outcome> {
    let output = session.output();
    let market = open_market(session, &output.asset_id)?;
    let ctokens = mint_amount(&market, output.amount)?;
    Ok(Outcome::Supply { ctokens })
}

pub fn apply_supply(session: &mut Session, ctokens: Decimal) -> Result<()> {
    let output = session.output();
    let ctoken_asset_id = mint(session, &output.asset_id, output.amount, ctokens)?;
    session.transfer(PURPOSE_CTOKEN, &output.sender, &ctoken_asset_id, ctokens);
    Ok(())
}

pub fn evaluate_pledge(session: &mut Session) -> Evaluation<Outcome> {
    let output = session.output();
    let market = open_market_by_ctoken(session, &output.asset_id)?;
    if output.amount <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount.into());
    }
    if output.amount > market.ctokens {
        return Err(ErrorCode::PledgeNotAllowed.into());
    }
    Ok(Outcome::Pledge {
        ctokens: output.amount,
    })
}

pub fn apply_pledge(session: &mut Session, ctokens: Decimal) -> Result<()> {
    let output = session.output();
    let asset_id = session
        .market_by_ctoken(&output.asset_id)?
        .map(|m| m.asset_id)
        .ok_or_else(|| anyhow!("No market for ctoken {}", output.asset_id))?;
    session.market_mut(&asset_id)?;
    session.supply_mut(&output.sender, &output.asset_id)?.collaterals += ctokens;
    Ok(())
}

/// Supply and pledge in one step: the minted ctokens go straight to
/// collateral instead of back to the sender.
pub fn evaluate_quick_pledge(session: &mut Session) -> Evaluation<Outcome> {
    let output = session.output();
    let market = open_market(session, &output.asset_id)?;
    let ctokens = mint_amount(&market, output.amount)?;
    Ok(Outcome::QuickPledge { ctokens })
}

pub fn apply_quick_pledge(session: &mut Session, ctokens: Decimal) -> Result<()> {
    let output = session.output();
    let ctoken_asset_id = mint(session, &output.asset_id, output.amount, ctokens)?;
    session.supply_mut(&output.sender, &ctoken_asset_id)?.collaterals += ctokens;
    Ok(())
}
