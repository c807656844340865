use crate::schema::properties;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = properties)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Property {
    pub key: String,
    pub value: String,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = properties)]
pub struct NewProperty {
    pub key: String,
    pub value: String,
    pub updated_at: Option<NaiveDateTime>,
}
