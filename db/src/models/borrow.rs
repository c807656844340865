use crate::schema::borrows;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use std::hash::{Hash, Hasher};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = borrows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Borrow {
    pub id: i32,
    pub user_id: String,
    pub asset_id: String,
    pub principal: String,
    pub interest_index: String,
    pub version: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PartialEq for Borrow {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id && self.asset_id == other.asset_id
    }
}

impl Eq for Borrow {}

impl Hash for Borrow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.user_id.hash(state);
        self.asset_id.hash(state);
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = borrows)]
pub struct NewBorrow {
    pub user_id: String,
    pub asset_id: String,
    pub principal: String,
    pub interest_index: String,
    pub version: i64,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = borrows)]
pub struct UpdateBorrow {
    pub principal: String,
    pub interest_index: String,
    pub version: i64,
    pub updated_at: Option<NaiveDateTime>,
}
