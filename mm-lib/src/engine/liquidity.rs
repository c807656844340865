use crate::error::ErrorCode;
use crate::service::worker_pool::WorkerPool;
use crate::types::{AccountLiquidity, Borrow, Market, Supply};
use crate::utils::{ceil16, trunc16};

use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Current debt of a position: `principal * borrowIndex / interestIndex`,
/// rounded up.
pub fn borrow_balance(borrow: &Borrow, market: &Market) -> Decimal {
    if borrow.principal.is_zero() || borrow.interest_index.is_zero() {
        return Decimal::ZERO;
    }
    ceil16(borrow.principal * market.borrow_index / borrow.interest_index)
}

pub fn collateral_value(supply: &Supply, market: &Market) -> Decimal {
    trunc16(supply.collaterals * market.exchange_rate * market.collateral_factor * market.price)
}

pub fn debt_value(borrow: &Borrow, market: &Market) -> Decimal {
    ceil16(borrow_balance(borrow, market) * market.price)
}

/// A position paired with the market snapshot used to value it.
#[derive(Debug, Clone, Copy)]
pub enum Position<'a> {
    Collateral(&'a Supply, &'a Market),
    Debt(&'a Borrow, &'a Market),
}

impl Position<'_> {
    /// `(collateral value, debt value)` contributed by this position.
    pub fn value(&self) -> (Decimal, Decimal) {
        match self {
            Position::Collateral(supply, market) => (collateral_value(supply, market), Decimal::ZERO),
            Position::Debt(borrow, market) => (Decimal::ZERO, debt_value(borrow, market)),
        }
    }
}

/// Market snapshots indexed by underlying and ctoken asset id. Later inserts
/// replace earlier ones, which is how overrides take effect.
#[derive(Debug, Default)]
pub struct MarketBook<'a> {
    by_asset: BTreeMap<&'a str, &'a Market>,
    by_ctoken: BTreeMap<&'a str, &'a Market>,
}

impl<'a> MarketBook<'a> {
    pub fn new(markets: &'a [Market], overrides: &'a [Market]) -> Self {
        let mut book = MarketBook::default();
        for market in markets.iter().chain(overrides) {
            book.by_asset.insert(&market.asset_id, market);
            book.by_ctoken.insert(&market.ctoken_asset_id, market);
        }
        book
    }

    pub fn positions(
        &self,
        supplies: &'a [Supply],
        borrows: &'a [Borrow],
    ) -> Result<Vec<Position<'a>>, ErrorCode> {
        let mut positions = Vec::with_capacity(supplies.len() + borrows.len());

        for supply in supplies.iter().filter(|s| !s.collaterals.is_zero()) {
            let market = self
                .by_ctoken
                .get(supply.ctoken_asset_id.as_str())
                .ok_or(ErrorCode::MarketNotFound)?;
            positions.push(Position::Collateral(supply, market));
        }

        for borrow in borrows.iter().filter(|b| !b.principal.is_zero()) {
            let market = self
                .by_asset
                .get(borrow.asset_id.as_str())
                .ok_or(ErrorCode::MarketNotFound)?;
            positions.push(Position::Debt(borrow, market));
        }

        Ok(positions)
    }
}

fn sum(values: impl IntoIterator<Item = (Decimal, Decimal)>) -> AccountLiquidity {
    let (collateral_value, debt_value) = values
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(c, d), (vc, vd)| (c + vc, d + vd));

    AccountLiquidity {
        liquidity: collateral_value - debt_value,
        collateral_value,
        debt_value,
    }
}

/// Collateral value minus debt value over every position of one account.
/// `overrides` replace the stored snapshot of the same market.
pub fn account_liquidity(
    supplies: &[Supply],
    borrows: &[Borrow],
    markets: &[Market],
    overrides: &[Market],
) -> Result<AccountLiquidity, ErrorCode> {
    let book = MarketBook::new(markets, overrides);
    let positions = book.positions(supplies, borrows)?;
    Ok(sum(positions.iter().map(Position::value)))
}

/// Same as [`account_liquidity`], valuing positions on the worker pool.
/// Values are summed after the pool joins, in position order.
pub fn account_liquidity_on(
    pool: &WorkerPool,
    supplies: &[Supply],
    borrows: &[Borrow],
    markets: &[Market],
    overrides: &[Market],
) -> Result<AccountLiquidity, ErrorCode> {
    let book = MarketBook::new(markets, overrides);
    let positions = book.positions(supplies, borrows)?;
    Ok(sum(pool.map(&positions, |p| p.value())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::{dec, market};

    fn btc() -> Market {
        let mut m = market();
        m.symbol = "BTC".into();
        m.asset_id = "btc".into();
        m.ctoken_asset_id = "cbtc".into();
        m.exchange_rate = dec("0.02");
        m.collateral_factor = dec("0.7");
        m.price = dec("30000");
        m
    }

    fn usdt() -> Market {
        let mut m = market();
        m.borrow_index = dec("1.1");
        m.price = Decimal::ONE;
        m
    }

    fn supply(ctokens: &str) -> Supply {
        Supply {
            user_id: "alice".into(),
            ctoken_asset_id: "cbtc".into(),
            collaterals: dec(ctokens),
            version: 1,
        }
    }

    fn borrow(principal: &str) -> Borrow {
        Borrow {
            user_id: "alice".into(),
            asset_id: "usdt".into(),
            principal: dec(principal),
            interest_index: Decimal::ONE,
            version: 1,
        }
    }

    #[test]
    fn balance_grows_with_index_and_rounds_up() {
        let mut m = usdt();
        m.borrow_index = dec("1.00000000000000003");
        let b = Borrow {
            interest_index: dec("3"),
            ..borrow("1")
        };

        assert_eq!(borrow_balance(&b, &m), dec("0.3333333333333334"));
        assert_eq!(borrow_balance(&borrow("100"), &usdt()), dec("110"));
        assert_eq!(borrow_balance(&borrow("0"), &usdt()), Decimal::ZERO);
    }

    #[test]
    fn liquidity_weights_collateral_and_debt() {
        let markets = vec![btc(), usdt()];
        // 50 cbtc * 0.02 * 0.7 * 30000 = 21000, debt 1000 * 1.1 = 1100
        let result = account_liquidity(&[supply("50")], &[borrow("1000")], &markets, &[]).unwrap();

        assert_eq!(result.collateral_value, dec("21000"));
        assert_eq!(result.debt_value, dec("1100"));
        assert_eq!(result.liquidity, dec("19900"));
    }

    #[test]
    fn overrides_replace_stored_snapshots() {
        let markets = vec![btc(), usdt()];
        let mut crashed = btc();
        crashed.price = dec("1000");

        let result = account_liquidity(
            &[supply("50")],
            &[borrow("1000")],
            &markets,
            std::slice::from_ref(&crashed),
        )
        .unwrap();

        assert_eq!(result.collateral_value, dec("700"));
        assert!(result.liquidity < Decimal::ZERO);
    }

    #[test]
    fn missing_market_is_reported() {
        let markets = vec![usdt()];
        assert_eq!(
            account_liquidity(&[supply("1")], &[], &markets, &[]),
            Err(ErrorCode::MarketNotFound)
        );
    }

    #[test]
    fn pool_valuation_matches_sequential() {
        let pool = WorkerPool::new(2).unwrap();
        let markets = vec![btc(), usdt()];
        let supplies = [supply("12.34567891")];
        let borrows = [borrow("777.77")];

        assert_eq!(
            account_liquidity_on(&pool, &supplies, &borrows, &markets, &[]).unwrap(),
            account_liquidity(&supplies, &borrows, &markets, &[]).unwrap()
        );
    }
}
