use crate::handler::session::Session;

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::info;

/// Runs every data migration between `from` (exclusive) and `to`
/// (inclusive), in order, inside the session of the upgrading vote.
pub fn upgrade(session: &mut Session, from: i64, to: i64) -> Result<()> {
    for version in (from + 1)..=to {
        match version {
            2 => accrue_all_markets(session)?,
            3 => clear_dust_borrows(session)?,
            _ => {}
        }
        info!("Protocol migrated to version {}", version);
    }
    Ok(())
}

/// Brings every market to the current block so rates recorded from here on
/// use one snapshot.
fn accrue_all_markets(session: &mut Session) -> Result<()> {
    for market in session.store().list_markets()? {
        session.market_mut(&market.asset_id)?;
    }
    Ok(())
}

/// Closes borrows whose principal fell below one unit of asset precision.
/// They cannot be repaid by any payment the ledger can carry.
fn clear_dust_borrows(session: &mut Session) -> Result<()> {
    let dust = Decimal::new(1, 8);
    for stored in session.store().list_all_borrows()? {
        let Some(borrow) = session.borrow(&stored.user_id, &stored.asset_id)? else {
            continue;
        };
        if borrow.principal > Decimal::ZERO && borrow.principal < dust {
            if session.market(&stored.asset_id)?.is_some() {
                let market = session.market_mut(&stored.asset_id)?;
                market.total_borrows = (market.total_borrows - borrow.principal).max(Decimal::ZERO);
                market.refresh_snapshot();
            }
            let borrow = session.borrow_mut(&stored.user_id, &stored.asset_id)?;
            borrow.principal = Decimal::ZERO;
            borrow.interest_index = Decimal::ZERO;
        }
    }
    Ok(())
}
