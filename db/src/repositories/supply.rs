use crate::models::supply::{NewSupply, Supply, UpdateSupply};
use crate::repositories::SupplyRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct SupplyRepositoryImpl {
    db_pool: DbPool,
}

impl SupplyRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        SupplyRepositoryImpl { db_pool }
    }
}

impl SupplyRepository for SupplyRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, supply: &NewSupply) -> QueryResult<bool> {
        use crate::schema::supplies::dsl::*;

        let inserted_rows = diesel::insert_into(supplies)
            .values(supply)
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        user_id_str: &str,
        ctoken_asset_id_str: &str,
        supply: &UpdateSupply,
        expected_version: i64,
    ) -> QueryResult<bool> {
        use crate::schema::supplies::dsl::*;

        let updated_rows = diesel::update(
            supplies
                .filter(user_id.eq(user_id_str))
                .filter(ctoken_asset_id.eq(ctoken_asset_id_str))
                .filter(version.eq(expected_version)),
        )
        .set(supply)
        .execute(conn)?;

        Ok(updated_rows > 0)
    }

    fn find(&self, user_id_str: &str, ctoken_asset_id_str: &str) -> QueryResult<Option<Supply>> {
        use crate::schema::supplies::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        supplies
            .filter(user_id.eq(user_id_str))
            .filter(ctoken_asset_id.eq(ctoken_asset_id_str))
            .first(&mut conn)
            .optional()
    }

    fn find_by_user(&self, user_id_str: &str) -> QueryResult<Vec<Supply>> {
        use crate::schema::supplies::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        supplies
            .filter(user_id.eq(user_id_str))
            .order(ctoken_asset_id.asc())
            .load(&mut conn)
    }
}
