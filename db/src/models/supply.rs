use crate::schema::supplies;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = supplies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Supply {
    pub id: i32,
    pub user_id: String,
    pub ctoken_asset_id: String,
    pub collaterals: String,
    pub version: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = supplies)]
pub struct NewSupply {
    pub user_id: String,
    pub ctoken_asset_id: String,
    pub collaterals: String,
    pub version: i64,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = supplies)]
pub struct UpdateSupply {
    pub collaterals: String,
    pub version: i64,
    pub updated_at: Option<NaiveDateTime>,
}
