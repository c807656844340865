use crate::models::property::{NewProperty, Property};
use crate::repositories::PropertyRepository;
use crate::{get_connection, DbPool};

use chrono::Utc;
use diesel::prelude::*;

pub struct PropertyRepositoryImpl {
    db_pool: DbPool,
}

impl PropertyRepositoryImpl {
    pub fn new(db_pool: DbPool) -> Self {
        PropertyRepositoryImpl { db_pool }
    }
}

impl PropertyRepository for PropertyRepositoryImpl {
    fn save(&self, conn: &mut PgConnection, key_str: &str, value_str: &str) -> QueryResult<()> {
        use crate::schema::properties::dsl::*;

        let now = Utc::now().naive_utc();
        let property = NewProperty {
            key: key_str.to_string(),
            value: value_str.to_string(),
            updated_at: Some(now),
        };

        diesel::insert_into(properties)
            .values(&property)
            .on_conflict(key)
            .do_update()
            .set((value.eq(value_str), updated_at.eq(Some(now))))
            .execute(conn)?;

        Ok(())
    }

    fn find(&self, key_str: &str) -> QueryResult<Option<Property>> {
        use crate::schema::properties::dsl::*;
        let mut conn = get_connection(&self.db_pool)?;

        properties.find(key_str).first(&mut conn).optional()
    }
}
