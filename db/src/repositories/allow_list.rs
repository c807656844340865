use crate::models::allow_list::{AllowList, NewAllowList};
use crate::repositories::AllowListRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct AllowListRepositoryImpl {
    db_pool: DbPool,
}

impl AllowListRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        AllowListRepositoryImpl { db_pool }
    }
}

impl AllowListRepository for AllowListRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, entry: &NewAllowList) -> QueryResult<bool> {
        use crate::schema::allow_lists::dsl::*;

        let inserted_rows = diesel::insert_into(allow_lists)
            .values(entry)
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn delete(&self, conn: &mut PgConnection, scope_str: &str, user_id_str: &str) -> QueryResult<bool> {
        use crate::schema::allow_lists::dsl::*;

        let deleted_rows = diesel::delete(
            allow_lists
                .filter(scope.eq(scope_str))
                .filter(user_id.eq(user_id_str)),
        )
        .execute(conn)?;

        Ok(deleted_rows > 0)
    }

    fn find(&self, scope_str: &str, user_id_str: &str) -> QueryResult<Option<AllowList>> {
        use crate::schema::allow_lists::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        allow_lists
            .filter(scope.eq(scope_str))
            .filter(user_id.eq(user_id_str))
            .first(&mut conn)
            .optional()
    }

    fn count_by_scope(&self, scope_str: &str) -> QueryResult<i64> {
        use crate::schema::allow_lists::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        allow_lists
            .filter(scope.eq(scope_str))
            .count()
            .get_result(&mut conn)
    }
}
