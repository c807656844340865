use crate::models::output::Output;
use crate::repositories::OutputRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct OutputRepositoryImpl {
    db_pool: DbPool,
}

impl OutputRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        OutputRepositoryImpl { db_pool }
    }
}

impl OutputRepository for OutputRepositoryImpl {
    fn list_after(&self, after_id: i64, limit: i64) -> QueryResult<Vec<Output>> {
        use crate::schema::outputs::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        outputs
            .filter(id.gt(after_id))
            .order(id.asc())
            .limit(limit)
            .load(&mut conn)
    }
}
