use crate::models::oracle_signer::{NewOracleSigner, OracleSigner};
use crate::repositories::OracleSignerRepository;
use crate::{get_connection, DbPool};

use diesel::prelude::*;

pub struct OracleSignerRepositoryImpl {
    db_pool: DbPool,
}

impl OracleSignerRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        OracleSignerRepositoryImpl { db_pool }
    }
}

impl OracleSignerRepository for OracleSignerRepositoryImpl {
    fn create(&self, conn: &mut PgConnection, signer: &NewOracleSigner) -> QueryResult<bool> {
        use crate::schema::oracle_signers::dsl::*;

        let inserted_rows = diesel::insert_into(oracle_signers)
            .values(signer)
            .on_conflict(user_id)
            .do_nothing()
            .execute(conn)?;

        Ok(inserted_rows > 0)
    }

    fn delete(&self, conn: &mut PgConnection, user_id_str: &str) -> QueryResult<bool> {
        use crate::schema::oracle_signers::dsl::*;

        let deleted_rows =
            diesel::delete(oracle_signers.filter(user_id.eq(user_id_str))).execute(conn)?;

        Ok(deleted_rows > 0)
    }

    fn find_all(&self) -> QueryResult<Vec<OracleSigner>> {
        use crate::schema::oracle_signers::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        oracle_signers.order(user_id.asc()).load(&mut conn)
    }
}
