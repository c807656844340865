use super::session::Session;
use crate::error::{ErrorCode, Evaluation};
use crate::operation::PriceAttestation;
use crate::oracle::PriceOracle;
use crate::types::Outcome;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub fn evaluate(
    session: &mut Session,
    attestation: &PriceAttestation,
    oracle: &dyn PriceOracle,
) -> Evaluation<Outcome> {
    let market = session
        .market(&attestation.asset_id)?
        .ok_or(ErrorCode::MarketNotFound)?;

    let signers = session.store().list_oracle_signers()?;
    let price = oracle.verify(attestation, &signers)?;
    if price <= Decimal::ZERO {
        return Err(ErrorCode::InvalidArgument.into());
    }

    let timestamp =
        DateTime::from_timestamp(attestation.timestamp, 0).ok_or(ErrorCode::InvalidArgument)?;
    if market.price_updated_at.is_some_and(|updated| timestamp <= updated) {
        return Err(ErrorCode::InvalidArgument.into());
    }

    Ok(Outcome::ProvidePrice {
        asset_id: attestation.asset_id.clone(),
        price,
        timestamp,
    })
}

pub fn apply(
    session: &mut Session,
    asset_id: &str,
    price: Decimal,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    let market = session.market_mut(asset_id)?;
    market.price = price;
    market.price_updated_at = Some(timestamp);
    session.return_inbound();
    Ok(())
}
