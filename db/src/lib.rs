pub mod models;
pub mod repositories;
pub mod schema;

use anyhow::{anyhow, Result};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn establish_connection_pool(
    database_url: &str,
    max_size: usize,
    idle_size: usize,
) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let db_pool = Pool::builder()
        .max_size(max_size as u32)
        .min_idle(Some(idle_size as u32))
        .build(manager)
        .map_err(|e| anyhow!("Failed to create pool: {}", e))?;

    Ok(db_pool)
}

pub fn run_migrations(db_pool: &DbPool) -> Result<()> {
    let mut conn = db_pool
        .get()
        .map_err(|e| anyhow!("Failed to get connection from pool: {}", e))?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;

    Ok(())
}

/// Checks out a pooled connection, surfacing pool exhaustion as a diesel error
/// so repositories can keep returning `QueryResult`.
pub fn get_connection(db_pool: &DbPool) -> QueryResult<DbConnection> {
    db_pool.get().map_err(|e| {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UnableToSendCommand,
            Box::new(e.to_string()),
        )
    })
}

/// Runs `f` inside a single database transaction. Every write issued through
/// the connection handed to `f` is committed together or not at all.
pub fn run_in_transaction<T, F>(db_pool: &DbPool, f: F) -> QueryResult<T>
where
    F: FnOnce(&mut PgConnection) -> QueryResult<T>,
{
    let mut conn = get_connection(db_pool)?;
    conn.transaction(|conn| f(conn))
}
