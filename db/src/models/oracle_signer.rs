use crate::schema::oracle_signers;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = oracle_signers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OracleSigner {
    pub id: i32,
    pub user_id: String,
    pub public_key: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = oracle_signers)]
pub struct NewOracleSigner {
    pub user_id: String,
    pub public_key: String,
    pub created_at: Option<NaiveDateTime>,
}
