use crate::models::market::{Market, NewMarket, UpdateMarket};
use crate::repositories::MarketRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct MarketRepositoryImpl {
    db_pool: DbPool,
}

impl MarketRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }
}

impl MarketRepository for MarketRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, market: &NewMarket) -> QueryResult<bool> {
        use crate::schema::markets::dsl::*;

        let inserted_rows = diesel::insert_into(markets)
            .values(market)
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        asset_id_str: &str,
        market: &UpdateMarket,
        expected_version: i64,
    ) -> QueryResult<bool> {
        use crate::schema::markets::dsl::*;

        let updated_rows = diesel::update(
            markets
                .filter(asset_id.eq(asset_id_str))
                .filter(version.eq(expected_version)),
        )
        .set(market)
        .execute(conn)?;

        Ok(updated_rows > 0)
    }

    fn find_by_asset_id(&self, asset_id_str: &str) -> QueryResult<Option<Market>> {
        use crate::schema::markets::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        markets
            .filter(asset_id.eq(asset_id_str))
            .first(&mut conn)
            .optional()
    }

    fn find_by_ctoken_asset_id(&self, ctoken_asset_id_str: &str) -> QueryResult<Option<Market>> {
        use crate::schema::markets::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        markets
            .filter(ctoken_asset_id.eq(ctoken_asset_id_str))
            .first(&mut conn)
            .optional()
    }

    fn find_all(&self) -> QueryResult<Vec<Market>> {
        use crate::schema::markets::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        markets.order(id.asc()).load(&mut conn)
    }
}
