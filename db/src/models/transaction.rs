use crate::schema::transactions;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use serde_json::Value;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: i32,
    pub trace_id: String,
    pub output_id: i64,
    pub user_id: String,
    pub action: i32,
    pub status: i32,
    pub error_code: Option<i32>,
    pub data: Value,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub trace_id: String,
    pub output_id: i64,
    pub user_id: String,
    pub action: i32,
    pub status: i32,
    pub error_code: Option<i32>,
    pub data: Value,
    pub created_at: NaiveDateTime,
}
