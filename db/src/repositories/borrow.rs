use crate::models::borrow::{Borrow, NewBorrow, UpdateBorrow};
use crate::repositories::BorrowRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct BorrowRepositoryImpl {
    db_pool: DbPool,
}

impl BorrowRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        BorrowRepositoryImpl { db_pool }
    }
}

impl BorrowRepository for BorrowRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, borrow: &NewBorrow) -> QueryResult<bool> {
        use crate::schema::borrows::dsl::*;

        let inserted_rows = diesel::insert_into(borrows)
            .values(borrow)
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn update_if_version(
        &self,
        conn: &mut PgConnection,
        user_id_str: &str,
        asset_id_str: &str,
        borrow: &UpdateBorrow,
        expected_version: i64,
    ) -> QueryResult<bool> {
        use crate::schema::borrows::dsl::*;

        let updated_rows = diesel::update(
            borrows
                .filter(user_id.eq(user_id_str))
                .filter(asset_id.eq(asset_id_str))
                .filter(version.eq(expected_version)),
        )
        .set(borrow)
        .execute(conn)?;

        Ok(updated_rows > 0)
    }

    fn find(&self, user_id_str: &str, asset_id_str: &str) -> QueryResult<Option<Borrow>> {
        use crate::schema::borrows::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        borrows
            .filter(user_id.eq(user_id_str))
            .filter(asset_id.eq(asset_id_str))
            .first(&mut conn)
            .optional()
    }

    fn find_by_user(&self, user_id_str: &str) -> QueryResult<Vec<Borrow>> {
        use crate::schema::borrows::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        borrows
            .filter(user_id.eq(user_id_str))
            .order(asset_id.asc())
            .load(&mut conn)
    }

    fn find_all(&self) -> QueryResult<Vec<Borrow>> {
        use crate::schema::borrows::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        borrows.order(id.asc()).load(&mut conn)
    }

    fn find_distinct_users(&self) -> QueryResult<Vec<String>> {
        use crate::schema::borrows::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        borrows
            .select(user_id)
            .distinct()
            .order(user_id.asc())
            .load(&mut conn)
    }
}
