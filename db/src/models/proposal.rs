use crate::schema::proposals;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use serde_json::Value;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = proposals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Proposal {
    pub id: i32,
    pub trace_id: String,
    pub creator: String,
    pub action: i32,
    pub content: String,
    pub votes: Value,
    pub passed_at: Option<NaiveDateTime>,
    pub applied_at: Option<NaiveDateTime>,
    pub version: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = proposals)]
pub struct NewProposal {
    pub trace_id: String,
    pub creator: String,
    pub action: i32,
    pub content: String,
    pub votes: Value,
    pub passed_at: Option<NaiveDateTime>,
    pub applied_at: Option<NaiveDateTime>,
    pub version: i64,
    pub created_at: Option<NaiveDateTime>,
}

/// `passed_at` and `applied_at` are skipped when `None`, so a pass can never
/// be reverted by a later update.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = proposals)]
pub struct UpdateProposal {
    pub votes: Value,
    pub passed_at: Option<NaiveDateTime>,
    pub applied_at: Option<NaiveDateTime>,
    pub version: i64,
    pub updated_at: Option<NaiveDateTime>,
}
