use super::migration;
use crate::constant::{
    PROPERTY_OUTPUTS_CHECKPOINT, PROPERTY_SYSTEM_VERSION, PURPOSE_WITHDRAW, SUPPORTED_VERSION,
};
use crate::handler::session::Session;
use crate::error::{ErrorCode, Evaluation};
use crate::operation::{AdminAction, MarketParams, OperationKind, WithdrawReservesParams};
use crate::store::ScopeChange;
use crate::types::{Market, MarketStatus};
use crate::utils::trunc8;

use rust_decimal::Decimal;
use tracing::info;

fn known_scope(scope: &str) -> bool {
    OperationKind::USER_KINDS
        .iter()
        .any(|kind| kind.scope() == scope)
}

/// Parses a protocol version upgrade. Versions only move forward and never
/// past what this build supports.
pub fn parse_version(current: i64, value: &str) -> Result<i64, ErrorCode> {
    let target = value
        .trim()
        .parse::<i64>()
        .map_err(|_| ErrorCode::InvalidArgument)?;
    if target <= current || target > SUPPORTED_VERSION {
        return Err(ErrorCode::InvalidArgument);
    }
    Ok(target)
}

/// Checks an action against current state. Runs when the proposal is made
/// and again when it passes, since state may have moved in between.
pub fn validate(session: &mut Session, action: &AdminAction) -> Evaluation<()> {
    match action {
        AdminAction::UpsertMarket(params) => {
            params.validate()?;
            if let Some(market) = session.market_by_ctoken(&params.ctoken_asset_id)? {
                if market.asset_id != params.asset_id {
                    return Err(ErrorCode::InvalidArgument.into());
                }
            }
            if let Some(market) = session.market_by_ctoken(&params.asset_id)? {
                // an underlying asset cannot be another market's ctoken
                if market.asset_id != params.asset_id {
                    return Err(ErrorCode::InvalidArgument.into());
                }
            }
            if let Some(market) = session.market(&params.ctoken_asset_id)? {
                // nor can a ctoken be another market's underlying
                if market.asset_id != params.asset_id {
                    return Err(ErrorCode::InvalidArgument.into());
                }
            }
            if let Some(market) = session.market(&params.asset_id)? {
                if market.ctoken_asset_id != params.ctoken_asset_id {
                    return Err(ErrorCode::InvalidArgument.into());
                }
            }
        }
        AdminAction::OpenMarket(r) | AdminAction::CloseMarket(r) => {
            session.market(&r.asset_id)?.ok_or(ErrorCode::MarketNotFound)?;
        }
        AdminAction::AddOracleSigner(params) => {
            if params.user_id.is_empty() || params.public_key.is_empty() {
                return Err(ErrorCode::InvalidArgument.into());
            }
        }
        AdminAction::RemoveOracleSigner(params) => {
            if params.user_id.is_empty() {
                return Err(ErrorCode::InvalidArgument.into());
            }
        }
        AdminAction::AddScope(params) | AdminAction::RemoveScope(params) => {
            if !known_scope(&params.scope) || params.user_id.is_empty() {
                return Err(ErrorCode::InvalidArgument.into());
            }
        }
        AdminAction::SetProperty(params) => {
            if params.key.is_empty() || params.key == PROPERTY_OUTPUTS_CHECKPOINT {
                return Err(ErrorCode::InvalidArgument.into());
            }
            if params.key == PROPERTY_SYSTEM_VERSION {
                parse_version(session.protocol_version()?, &params.value)?;
            }
        }
        AdminAction::ProvidePrice(params) => {
            session.market(&params.asset_id)?.ok_or(ErrorCode::MarketNotFound)?;
            if params.price <= Decimal::ZERO {
                return Err(ErrorCode::InvalidArgument.into());
            }
        }
        AdminAction::WithdrawReserves(params) => {
            session.market(&params.asset_id)?.ok_or(ErrorCode::MarketNotFound)?;
            if params.opponent.is_empty() || trunc8(params.amount) <= Decimal::ZERO {
                return Err(ErrorCode::InvalidAmount.into());
            }
        }
    }
    Ok(())
}

/// Applies a passed action. Everything that can reject is checked before the
/// first write, so a rejected effect leaves the session untouched.
pub fn apply(session: &mut Session, action: &AdminAction) -> Evaluation<()> {
    validate(session, action)?;

    match action {
        AdminAction::UpsertMarket(params) => upsert_market(session, params)?,
        AdminAction::OpenMarket(r) => {
            session.market_mut(&r.asset_id)?.status = MarketStatus::Open;
        }
        AdminAction::CloseMarket(r) => {
            session.market_mut(&r.asset_id)?.status = MarketStatus::Closed;
        }
        AdminAction::AddOracleSigner(params) => {
            session.add_signer(&params.user_id, &params.public_key);
        }
        AdminAction::RemoveOracleSigner(params) => session.remove_signer(&params.user_id),
        AdminAction::AddScope(params) => session.change_scope(ScopeChange::Add {
            scope: params.scope.clone(),
            user_id: params.user_id.clone(),
        }),
        AdminAction::RemoveScope(params) => session.change_scope(ScopeChange::Remove {
            scope: params.scope.clone(),
            user_id: params.user_id.clone(),
        }),
        AdminAction::SetProperty(params) => {
            if params.key == PROPERTY_SYSTEM_VERSION {
                let current = session.protocol_version()?;
                let target = parse_version(current, &params.value)?;
                migration::upgrade(session, current, target)?;
                session.set_property(&params.key, &target.to_string());
            } else {
                session.set_property(&params.key, &params.value);
            }
        }
        AdminAction::ProvidePrice(params) => {
            let now = session.now();
            let market = session.market_mut(&params.asset_id)?;
            market.price = params.price;
            market.price_updated_at = Some(now);
        }
        AdminAction::WithdrawReserves(params) => withdraw_reserves(session, params)?,
    }
    Ok(())
}

fn upsert_market(session: &mut Session, params: &MarketParams) -> Evaluation<()> {
    let now = session.now();

    if session.market(&params.asset_id)?.is_some() {
        let market = session.market_mut(&params.asset_id)?;
        market.symbol = params.symbol.clone();
        market.init_exchange_rate = params.init_exchange_rate;
        market.reserve_factor = params.reserve_factor;
        market.liquidation_incentive = params.liquidation_incentive;
        market.borrow_cap = params.borrow_cap;
        market.collateral_factor = params.collateral_factor;
        market.close_factor = params.close_factor;
        market.base_rate = params.base_rate;
        market.multiplier = params.multiplier;
        market.jump_multiplier = params.jump_multiplier;
        market.kink = params.kink;
        if params.price > Decimal::ZERO {
            market.price = params.price;
            market.price_updated_at = Some(now);
        }
        market.refresh_snapshot();
        info!("Market {} updated", params.asset_id);
        return Ok(());
    }

    let mut market = Market {
        symbol: params.symbol.clone(),
        asset_id: params.asset_id.clone(),
        ctoken_asset_id: params.ctoken_asset_id.clone(),
        total_cash: Decimal::ZERO,
        total_borrows: Decimal::ZERO,
        reserves: Decimal::ZERO,
        ctokens: Decimal::ZERO,
        init_exchange_rate: params.init_exchange_rate,
        reserve_factor: params.reserve_factor,
        liquidation_incentive: params.liquidation_incentive,
        borrow_cap: params.borrow_cap,
        collateral_factor: params.collateral_factor,
        close_factor: params.close_factor,
        base_rate: params.base_rate,
        multiplier: params.multiplier,
        jump_multiplier: params.jump_multiplier,
        kink: params.kink,
        block_number: session.block(),
        utilization_rate: Decimal::ZERO,
        exchange_rate: params.init_exchange_rate,
        supply_rate_per_block: Decimal::ZERO,
        borrow_rate_per_block: Decimal::ZERO,
        price: params.price,
        price_updated_at: (params.price > Decimal::ZERO).then_some(now),
        borrow_index: Decimal::ONE,
        status: MarketStatus::Open,
        version: 0,
    };
    market.refresh_snapshot();
    session.insert_market(market);
    info!("Market {} created", params.asset_id);
    Ok(())
}

fn withdraw_reserves(session: &mut Session, params: &WithdrawReservesParams) -> Evaluation<()> {
    let amount = trunc8(params.amount);
    let market = session
        .market(&params.asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;
    if amount > market.reserves || amount > market.total_cash {
        return Err(ErrorCode::InvalidAmount.into());
    }

    let market = session.market_mut(&params.asset_id)?;
    market.reserves -= amount;
    market.total_cash -= amount;
    market.refresh_snapshot();
    session.transfer(PURPOSE_WITHDRAW, &params.opponent, &params.asset_id, amount);
    Ok(())
}
