//! PostgreSQL access-log store.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::backends::{BackendError, RecordStore};
use crate::workflow::AccessRecord;

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const INSERT_ACCESS: &str = "INSERT INTO access_log (timestamp) VALUES ($1)";

/// Record store backed by a sqlx connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Open a pool against `dsn`.
    ///
    /// # Errors
    ///
    /// Returns error if the first connection cannot be established.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await?;

        tracing::info!(max_connections, "PostgreSQL pool connected");
        Ok(Self { pool })
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns error if a migration fails or the applied history diverges
    /// from the embedded one.
    pub async fn run_migrations(&self) -> Result<(), BackendError> {
        MIGRATOR.run(&self.pool).await?;
        tracing::info!(migrations = MIGRATOR.iter().count(), "Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn insert_access(&self, record: &AccessRecord) -> Result<(), BackendError> {
        sqlx::query(INSERT_ACCESS)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn probe(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_create_access_log() {
        let migrations: Vec<_> = MIGRATOR.iter().collect();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[0].description, "access log");
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS access_log"));
        assert!(migrations[0].sql.contains("timestamp TIMESTAMPTZ NOT NULL"));
    }

    #[test]
    fn test_insert_targets_migrated_table() {
        let sql = &MIGRATOR.iter().next().unwrap().sql;
        assert!(sql.contains("access_log"));
        assert!(INSERT_ACCESS.starts_with("INSERT INTO access_log (timestamp)"));
    }
}
