use crate::schema::transfers;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use serde_json::Value;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = transfers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transfer {
    pub id: i32,
    pub trace_id: String,
    pub output_id: i64,
    pub opponents: Value,
    pub threshold: i32,
    pub asset_id: String,
    pub amount: String,
    pub memo: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = transfers)]
pub struct NewTransfer {
    pub trace_id: String,
    pub output_id: i64,
    pub opponents: Value,
    pub threshold: i32,
    pub asset_id: String,
    pub amount: String,
    pub memo: String,
    pub created_at: NaiveDateTime,
}
