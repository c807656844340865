use crate::schema::outputs;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = outputs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Output {
    pub id: i64,
    pub trace_id: String,
    pub sender: String,
    pub asset_id: String,
    pub amount: String,
    pub memo: String,
    pub created_at: NaiveDateTime,
}
