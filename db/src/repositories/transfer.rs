use crate::models::transfer::{NewTransfer, Transfer};
use crate::repositories::TransferRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct TransferRepositoryImpl {
    db_pool: DbPool,
}

impl TransferRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        TransferRepositoryImpl { db_pool }
    }
}

impl TransferRepository for TransferRepositoryImpl {
    /// Upserts by trace id: a transfer that already exists is left untouched.
    fn create_transfers(
        &self,
        conn: &mut PgConnection,
        new_transfers: &[NewTransfer],
    ) -> QueryResult<usize> {
        use crate::schema::transfers::dsl::*;

        if new_transfers.is_empty() {
            return Ok(0);
        }

        diesel::insert_into(transfers)
            .values(new_transfers)
            .on_conflict(trace_id)
            .do_nothing()
            .execute(conn)
    }

    fn find_by_output_id(&self, output_id_val: i64) -> QueryResult<Vec<Transfer>> {
        use crate::schema::transfers::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        transfers
            .filter(output_id.eq(output_id_val))
            .order(id.asc())
            .load(&mut conn)
    }
}
