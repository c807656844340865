use crate::models::transaction::{NewTransaction, Transaction};
use crate::repositories::TransactionRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct TransactionRepositoryImpl {
    db_pool: DbPool,
}

impl TransactionRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        TransactionRepositoryImpl { db_pool }
    }
}

impl TransactionRepository for TransactionRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, transaction: &NewTransaction) -> QueryResult<bool> {
        use crate::schema::transactions::dsl::*;

        let inserted_rows = diesel::insert_into(transactions)
            .values(transaction)
            .on_conflict(trace_id)
            .do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn find_by_trace_id(&self, trace_id_str: &str) -> QueryResult<Option<Transaction>> {
        use crate::schema::transactions::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        transactions
            .filter(trace_id.eq(trace_id_str))
            .first(&mut conn)
            .optional()
    }
}
