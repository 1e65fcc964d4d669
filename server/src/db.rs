use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use snapchef_core::StoreError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Build the connection pool and run pending migrations.
pub fn create_pool(database_url: &str) -> Result<DbPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .map_err(|e| StoreError::Database(format!("Failed to create database pool: {}", e)))?;

    let mut conn = pool
        .get()
        .map_err(|e| StoreError::Database(format!("Failed to get DB connection: {}", e)))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Database(format!("Failed to run database migrations: {}", e)))?;

    Ok(pool)
}
