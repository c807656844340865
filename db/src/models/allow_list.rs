use crate::schema::allow_lists;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = allow_lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AllowList {
    pub id: i32,
    pub scope: String,
    pub user_id: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = allow_lists)]
pub struct NewAllowList {
    pub scope: String,
    pub user_id: String,
    pub created_at: Option<NaiveDateTime>,
}
