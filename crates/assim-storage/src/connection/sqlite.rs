use super::{Backend, ConnectionTarget, DatabaseConfig, Dialect, connect_pool};
use crate::cursor::{Cursor, Record, Scope, SqlParam, SqlValue, bind_params};
use crate::error::{StorageError, StorageResult};
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, ConnectOptions, Row, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Embedded SQLite store, used for development and tests.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    fn connect_options(target: &ConnectionTarget) -> StorageResult<SqliteConnectOptions> {
        let ConnectionTarget::Url(url) = target else {
            return Err(StorageError::Configuration(
                "SQLite requires a sqlite: URL".to_string(),
            ));
        };

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true) // Enable foreign key constraints
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(10)) // Wait up to 10s for locks
            .disable_statement_logging();

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(options.get_filename()).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Configuration(format!("Failed to create database directory: {}", e))
            })?;
        }

        Ok(options)
    }

    /// Single-connection in-memory store with migrations applied.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // One connection that never expires, or the data goes with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let backend = Self { pool };
        backend.migrate().await?;

        Ok(backend)
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Backend for SqliteBackend {
    type Cursor = SqliteCursor;

    async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let options = Self::connect_options(&config.target)?;
        let pool = connect_pool::<Sqlite>(config, options).await?;
        Ok(Self { pool })
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn cursor(&self) -> StorageResult<SqliteCursor> {
        Ok(SqliteCursor {
            scope: Scope::Pooled(self.pool.acquire().await?),
        })
    }

    async fn begin(&self) -> StorageResult<SqliteCursor> {
        Ok(SqliteCursor {
            scope: Scope::Transaction(self.pool.begin().await?),
        })
    }

    async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations/sqlite")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct SqliteCursor {
    scope: Scope<Sqlite>,
}

impl Cursor for SqliteCursor {
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Vec<Record>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(self.scope.connection())
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<Record>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(self.scope.connection())
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<u64> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(self.scope.connection())
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<i64>> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(self.scope.connection())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let id = result.last_insert_rowid();
        Ok((id != 0).then_some(id))
    }

    async fn commit(self) -> StorageResult<()> {
        self.scope.commit().await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.scope.rollback().await
    }
}

/// SQLite is dynamically typed; decode by the storage class of each value.
fn decode_row(row: &SqliteRow) -> StorageResult<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let (is_null, type_name) = {
            let raw = row.try_get_raw(index)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };

        let value = if is_null {
            SqlValue::Null
        } else {
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
                "REAL" | "NUMERIC" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                    SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
            }
        };

        record.insert(column.name(), value);
    }

    Ok(record)
}
