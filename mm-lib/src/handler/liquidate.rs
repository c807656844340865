use super::borrow::settle_debt;
use super::session::Session;
use crate::constant::{PURPOSE_CHANGE, PURPOSE_SEIZE};
use crate::engine::liquidity::borrow_balance;
use crate::error::{ErrorCode, Evaluation};
use crate::operation::LiquidateParams;
use crate::types::{Market, Outcome};
use crate::utils::{trunc16, trunc8};

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

/// Amounts of one liquidation, before any state changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeizeQuote {
    pub repay_value: Decimal,
    pub seized_ctokens: Decimal,
    pub repaid: Decimal,
    pub change: Decimal,
}

/// Prices a liquidation of `collaterals` ctokens of `supply_market` against
/// a debt of `balance` in `borrow_market`, paid with `pay_amount`.
///
/// The repaid value is capped by the payment, by the seizable share of the
/// collateral at its discounted price and by the outstanding debt. Seized
/// ctokens follow from the capped value.
pub fn seize_quote(
    supply_market: &Market,
    borrow_market: &Market,
    collaterals: Decimal,
    balance: Decimal,
    pay_amount: Decimal,
) -> Result<SeizeQuote, ErrorCode> {
    let borrow_price = borrow_market.price;
    let seized_price =
        trunc16(supply_market.price * (Decimal::ONE - supply_market.liquidation_incentive));
    if borrow_price <= Decimal::ZERO
        || seized_price <= Decimal::ZERO
        || supply_market.exchange_rate <= Decimal::ZERO
    {
        return Err(ErrorCode::SeizeNotAllowed);
    }

    let max_seize = trunc16(collaterals * supply_market.exchange_rate * supply_market.close_factor);
    let repay_value = trunc16(pay_amount * borrow_price)
        .min(trunc16(max_seize * seized_price))
        .min(trunc16(balance * borrow_price));

    let seized_ctokens = trunc8(trunc16(repay_value / seized_price) / supply_market.exchange_rate);
    if seized_ctokens <= Decimal::ZERO {
        return Err(ErrorCode::SeizeNotAllowed);
    }

    let actual_repay = trunc16(repay_value / borrow_price).min(pay_amount);
    let change = trunc8(pay_amount - actual_repay);

    Ok(SeizeQuote {
        repay_value,
        seized_ctokens,
        repaid: pay_amount - change,
        change,
    })
}

pub fn evaluate(session: &mut Session, params: &LiquidateParams) -> Evaluation<Outcome> {
    let output = session.output();
    if params.user_id == output.sender {
        return Err(ErrorCode::InvalidArgument.into());
    }
    if output.amount <= Decimal::ZERO {
        return Err(ErrorCode::InvalidAmount.into());
    }

    let borrow_market = session
        .market(&output.asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    let supply_market = session
        .market_by_ctoken(&params.ctoken_asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;

    let supply = session
        .supply(&params.user_id, &params.ctoken_asset_id)?
        .ok_or(ErrorCode::SupplyNotFound)?;
    if supply.collaterals <= Decimal::ZERO {
        return Err(ErrorCode::InsufficientCollaterals.into());
    }
    let borrow = session
        .borrow(&params.user_id, &output.asset_id)?
        .ok_or(ErrorCode::BorrowNotFound)?;
    let balance = borrow_balance(&borrow, &borrow_market);
    if balance <= Decimal::ZERO {
        return Err(ErrorCode::BorrowNotFound.into());
    }

    let positions = session.positions(&params.user_id)?;
    if session.liquidity(&positions)?.liquidity >= Decimal::ZERO {
        return Err(ErrorCode::SeizeNotAllowed.into());
    }

    let quote = seize_quote(
        &supply_market,
        &borrow_market,
        supply.collaterals,
        balance,
        output.amount,
    )?;

    Ok(Outcome::Liquidate {
        user_id: params.user_id.clone(),
        ctoken_asset_id: params.ctoken_asset_id.clone(),
        seized_ctokens: quote.seized_ctokens,
        repaid: quote.repaid,
        change: quote.change,
    })
}

pub fn apply(
    session: &mut Session,
    user_id: &str,
    ctoken_asset_id: &str,
    seized_ctokens: Decimal,
    repaid: Decimal,
    change: Decimal,
) -> Result<()> {
    let output = session.output();

    let supply_asset_id = session
        .market_by_ctoken(ctoken_asset_id)?
        .map(|m| m.asset_id)
        .ok_or_else(|| anyhow!("No market for ctoken {}", ctoken_asset_id))?;
    session.market_mut(&supply_asset_id)?;
    session.supply_mut(user_id, ctoken_asset_id)?.collaterals -= seized_ctokens;

    settle_debt(session, user_id, &output.asset_id, repaid)?;

    session.transfer(PURPOSE_SEIZE, &output.sender, ctoken_asset_id, seized_ctokens);
    session.transfer(PURPOSE_CHANGE, &output.sender, &output.asset_id, change);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::{dec, market};

    fn markets() -> (Market, Market) {
        let mut supply = market();
        supply.asset_id = "btc".into();
        supply.ctoken_asset_id = "cbtc".into();
        supply.price = dec("100");
        supply.exchange_rate = dec("1");
        supply.liquidation_incentive = dec("0.1");
        supply.close_factor = dec("0.5");

        let mut borrow = market();
        borrow.price = dec("1");
        (supply, borrow)
    }

    #[test]
    fn payment_below_limits_is_used_in_full() {
        let (supply, borrow) = markets();
        let quote = seize_quote(&supply, &borrow, dec("10"), dec("800"), dec("90")).unwrap();

        assert_eq!(quote.repay_value, dec("90"));
        assert_eq!(quote.seized_ctokens, dec("1"));
        assert_eq!(quote.repaid, dec("90"));
        assert_eq!(quote.change, Decimal::ZERO);
    }

    #[test]
    fn repay_is_clamped_by_seizable_collateral() {
        let (supply, borrow) = markets();
        // max seize 5 btc at 90 = 450
        let quote = seize_quote(&supply, &borrow, dec("10"), dec("800"), dec("600")).unwrap();

        assert_eq!(quote.repay_value, dec("450"));
        assert_eq!(quote.seized_ctokens, dec("5"));
        assert_eq!(quote.repaid, dec("450"));
        assert_eq!(quote.change, dec("150"));
    }

    #[test]
    fn repay_is_clamped_by_debt() {
        let (supply, borrow) = markets();
        let quote = seize_quote(&supply, &borrow, dec("10"), dec("45"), dec("100")).unwrap();

        assert_eq!(quote.repay_value, dec("45"));
        assert_eq!(quote.seized_ctokens, dec("0.5"));
        assert_eq!(quote.change, dec("55"));
    }

    #[test]
    fn worthless_collateral_cannot_be_seized() {
        let (mut supply, borrow) = markets();
        supply.price = Decimal::ZERO;
        assert_eq!(
            seize_quote(&supply, &borrow, dec("10"), dec("45"), dec("100")),
            Err(ErrorCode::SeizeNotAllowed)
        );
    }
}
