use crate::constant::BLOCKS_PER_YEAR;
use crate::types::Market;
use crate::utils::{ceil16, trunc16};

use rust_decimal::Decimal;

/// Converts an annual rate to a per-block rate.
pub fn per_block(annual_rate: Decimal) -> Decimal {
    trunc16(annual_rate / Decimal::from(BLOCKS_PER_YEAR))
}

pub fn utilization_rate(total_cash: Decimal, total_borrows: Decimal, reserves: Decimal) -> Decimal {
    let denominator = total_cash + total_borrows - reserves;
    if denominator <= Decimal::ZERO || total_borrows <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    trunc16(total_borrows / denominator)
}

pub fn exchange_rate(market: &Market) -> Decimal {
    if market.ctokens.is_zero() {
        return market.init_exchange_rate;
    }
    trunc16((market.total_cash + market.total_borrows - market.reserves) / market.ctokens)
}

pub fn borrow_rate_per_block(market: &Market, utilization_rate: Decimal) -> Decimal {
    let base = per_block(market.base_rate);
    let multiplier = per_block(market.multiplier);

    if market.kink.is_zero() || utilization_rate <= market.kink {
        return trunc16(utilization_rate * multiplier + base);
    }

    let jump = per_block(market.jump_multiplier);
    let normal_rate = market.kink * multiplier + base;
    let excess = utilization_rate - market.kink;
    trunc16(normal_rate + excess * jump)
}

pub fn supply_rate_per_block(
    utilization_rate: Decimal,
    borrow_rate: Decimal,
    reserve_factor: Decimal,
) -> Decimal {
    trunc16(utilization_rate * borrow_rate * (Decimal::ONE - reserve_factor))
}

/// Recomputes the display snapshot from the current totals.
pub fn refresh_snapshot(market: &mut Market) {
    let utilization = utilization_rate(market.total_cash, market.total_borrows, market.reserves);
    let borrow_rate = borrow_rate_per_block(market, utilization);

    market.utilization_rate = utilization;
    market.exchange_rate = exchange_rate(market);
    market.borrow_rate_per_block = borrow_rate;
    market.supply_rate_per_block =
        supply_rate_per_block(utilization, borrow_rate, market.reserve_factor);
}

/// Compounds interest up to `current_block` and refreshes the snapshot.
///
/// The borrow rate is derived from the totals as they stood before this
/// accrual. Calling it again for the same block only refreshes the snapshot.
pub fn accrue_interest(market: &mut Market, current_block: i64) {
    if current_block > market.block_number {
        let utilization =
            utilization_rate(market.total_cash, market.total_borrows, market.reserves);
        let borrow_rate = borrow_rate_per_block(market, utilization);
        let delta = Decimal::from(current_block - market.block_number);

        let interest = trunc16(market.total_borrows * borrow_rate * delta);
        market.total_borrows += interest;
        market.reserves += trunc16(interest * market.reserve_factor);
        market.borrow_index += ceil16(market.borrow_index * borrow_rate * delta);
        market.block_number = current_block;
    }

    refresh_snapshot(market);
}
