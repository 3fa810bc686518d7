//! Connection handling for the three supported dialects.
//!
//! [`Database`] is the explicit context every repository is built from. It is
//! created once by [`Database::connect`] and owns the pool of the dialect
//! selected by the configuration. Call sites never branch on the dialect:
//! quirks such as insert-id retrieval and placeholder syntax are handled by
//! each backend.

#![allow(async_fn_in_trait)]

pub mod config;
pub mod mysql;
pub mod postgres;
pub mod retry;
pub mod sqlite;

pub use config::{ConnectionTarget, DatabaseConfig, redact_url};
pub use mysql::{MySqlBackend, MySqlCursor};
pub use postgres::{PostgresBackend, PostgresCursor};
pub use retry::{Backoff, RetryExhausted, RetryPolicy, retry};
pub use sqlite::{SqliteBackend, SqliteCursor};

use crate::cursor::{Cursor, Record, SqlParam};
use crate::error::{StorageError, StorageResult};
use serde::Serialize;
use sqlx::Pool;
use sqlx::pool::PoolOptions;
use std::fmt;
use tracing::info;

/// SQL dialect family of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a URL scheme.
    ///
    /// `postgres*` selects PostgreSQL and `sqlite*` the embedded store.
    /// Everything else is treated as MySQL-compatible.
    pub fn from_url(url: &str) -> Self {
        let scheme = url
            .trim()
            .split(':')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if scheme.starts_with("postgres") {
            Dialect::Postgres
        } else if scheme.starts_with("sqlite") {
            Dialect::Sqlite
        } else {
            Dialect::MySql
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Case-sensitive "`column` contains the bound parameter" predicate.
    pub fn contains(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("INSTR(CAST({column} AS BINARY), ?) > 0"),
            Dialect::Postgres => format!("strpos({column}, ?) > 0"),
            Dialect::Sqlite => format!("instr({column}, ?) > 0"),
        }
    }

    /// Suffix for a `SELECT` that locks the rows it reads against writers.
    ///
    /// Empty on SQLite, where a write transaction already holds the database lock.
    pub fn for_update(&self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Postgres => " FOR UPDATE",
            Dialect::Sqlite => "",
        }
    }

    /// Suffix for a `SELECT` that keeps the rows it reads from being deleted
    /// until the transaction ends.
    pub fn for_share(&self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Postgres => " FOR SHARE",
            Dialect::Sqlite => "",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What every dialect backend provides.
pub trait Backend: Sized {
    type Cursor: Cursor;

    /// Build the pool, retrying while the server is unreachable.
    async fn connect(config: &DatabaseConfig) -> StorageResult<Self>;

    fn dialect(&self) -> Dialect;

    /// Autocommit cursor on a pooled connection.
    async fn cursor(&self) -> StorageResult<Self::Cursor>;

    /// Cursor inside a new transaction.
    async fn begin(&self) -> StorageResult<Self::Cursor>;

    async fn migrate(&self) -> StorageResult<()>;

    async fn health_check(&self) -> StorageResult<()>;

    async fn close(&self);
}

/// Open a pool with the sizing from `config`, retrying per its policy.
///
/// Options are built by the caller so malformed configuration fails before
/// the first attempt.
pub(crate) async fn connect_pool<DB>(
    config: &DatabaseConfig,
    options: <DB::Connection as sqlx::Connection>::Options,
) -> StorageResult<Pool<DB>>
where
    DB: sqlx::Database,
{
    let pool_options = PoolOptions::<DB>::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(Some(config.max_lifetime))
        .acquire_timeout(config.acquire_timeout);

    retry(&config.retry, "Database connection", |_| {
        pool_options.clone().connect_with(options.clone())
    })
    .await
    .map_err(|exhausted| StorageError::Connection {
        attempts: exhausted.attempts,
        source: exhausted.last,
    })
}

/// Swap the scheme of `url` for the one the driver expects.
///
/// `mysql+pymysql://...` becomes `mysql://...`.
pub(crate) fn replace_scheme(url: &str, scheme: &str) -> StorageResult<String> {
    let (_, rest) = url.trim().split_once("://").ok_or_else(|| {
        StorageError::Configuration(format!("Invalid database URL: {}", redact_url(url)))
    })?;
    Ok(format!("{scheme}://{rest}"))
}

/// Database context handed to repositories.
#[derive(Debug, Clone)]
pub enum Database {
    MySql(MySqlBackend),
    Postgres(PostgresBackend),
    Sqlite(SqliteBackend),
}

macro_rules! dispatch {
    ($self:expr, $backend:ident => $body:expr) => {
        match $self {
            Database::MySql($backend) => $body,
            Database::Postgres($backend) => $body,
            Database::Sqlite($backend) => $body,
        }
    };
}

impl Database {
    /// Connect using the dialect selected by `config`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use assim_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = DatabaseConfig::from_env()?.max_connections(10);
    /// let db = Database::connect(&config).await?;
    /// println!("connected to {}", db.dialect());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// `StorageError::Connection` once the retry policy is exhausted,
    /// `StorageError::Configuration` for an unusable target.
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let dialect = config.dialect();
        info!(
            "Connecting to {} database at {}",
            dialect,
            config.target.redacted()
        );

        let db = match dialect {
            Dialect::MySql => Database::MySql(MySqlBackend::connect(config).await?),
            Dialect::Postgres => Database::Postgres(PostgresBackend::connect(config).await?),
            Dialect::Sqlite => Database::Sqlite(SqliteBackend::connect(config).await?),
        };

        info!("Connected ({})", db.dialect());

        if config.auto_migrate {
            db.migrate().await?;
        }

        Ok(db)
    }

    /// Create an in-memory SQLite database (primarily for testing)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use assim_storage::connection::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::in_memory().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn in_memory() -> StorageResult<Self> {
        Ok(Database::Sqlite(SqliteBackend::in_memory().await?))
    }

    pub fn dialect(&self) -> Dialect {
        dispatch!(self, backend => backend.dialect())
    }

    /// Autocommit cursor. The connection returns to the pool on drop.
    pub async fn cursor(&self) -> StorageResult<DbCursor> {
        Ok(match self {
            Database::MySql(backend) => DbCursor::MySql(backend.cursor().await?),
            Database::Postgres(backend) => DbCursor::Postgres(backend.cursor().await?),
            Database::Sqlite(backend) => DbCursor::Sqlite(backend.cursor().await?),
        })
    }

    /// Transactional cursor. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> StorageResult<DbCursor> {
        Ok(match self {
            Database::MySql(backend) => DbCursor::MySql(backend.begin().await?),
            Database::Postgres(backend) => DbCursor::Postgres(backend.begin().await?),
            Database::Sqlite(backend) => DbCursor::Sqlite(backend.begin().await?),
        })
    }

    /// Run the embedded migrations for this dialect
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail to execute.
    pub async fn migrate(&self) -> StorageResult<()> {
        dispatch!(self, backend => backend.migrate().await)
    }

    /// Check if the database connection is healthy
    ///
    /// Executes a simple query to verify the connection is working.
    pub async fn health_check(&self) -> StorageResult<()> {
        dispatch!(self, backend => backend.health_check().await)
    }

    /// Close the database connection pool
    ///
    /// This will wait for all active connections to be returned to the pool
    /// before closing them.
    pub async fn close(&self) {
        dispatch!(self, backend => backend.close().await)
    }
}

/// A cursor on whichever dialect the [`Database`] was built for.
pub enum DbCursor {
    MySql(MySqlCursor),
    Postgres(PostgresCursor),
    Sqlite(SqliteCursor),
}

macro_rules! dispatch_cursor {
    ($self:expr, $cursor:ident => $body:expr) => {
        match $self {
            DbCursor::MySql($cursor) => $body,
            DbCursor::Postgres($cursor) => $body,
            DbCursor::Sqlite($cursor) => $body,
        }
    };
}

impl Cursor for DbCursor {
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Vec<Record>> {
        dispatch_cursor!(self, cursor => cursor.fetch_all(sql, params).await)
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<Record>> {
        dispatch_cursor!(self, cursor => cursor.fetch_optional(sql, params).await)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<u64> {
        dispatch_cursor!(self, cursor => cursor.execute(sql, params).await)
    }

    async fn insert(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<i64>> {
        dispatch_cursor!(self, cursor => cursor.insert(sql, params).await)
    }

    async fn commit(self) -> StorageResult<()> {
        dispatch_cursor!(self, cursor => cursor.commit().await)
    }

    async fn rollback(self) -> StorageResult<()> {
        dispatch_cursor!(self, cursor => cursor.rollback().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("postgres://u:p@host/db", Dialect::Postgres)]
    #[case("postgresql://u:p@host/db", Dialect::Postgres)]
    #[case("POSTGRES://u:p@host/db", Dialect::Postgres)]
    #[case("mysql://u:p@host/db", Dialect::MySql)]
    #[case("mysql+pymysql://u:p@host/db", Dialect::MySql)]
    #[case("mariadb://u:p@host/db", Dialect::MySql)]
    #[case("sqlite::memory:", Dialect::Sqlite)]
    #[case("sqlite://data/dev.db", Dialect::Sqlite)]
    fn test_dialect_from_url(#[case] url: &str, #[case] expected: Dialect) {
        assert_eq!(Dialect::from_url(url), expected);
    }

    #[test]
    fn test_replace_scheme() {
        assert_eq!(
            replace_scheme("mysql+pymysql://u:p@host:3306/db", "mysql").unwrap(),
            "mysql://u:p@host:3306/db"
        );
        assert!(matches!(
            replace_scheme("not a url", "mysql"),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_dialect_tags() {
        assert_eq!(Dialect::MySql.to_string(), "mysql");
        assert_eq!(Dialect::Postgres.as_str(), "postgres");
        assert_eq!(serde_json::to_string(&Dialect::Sqlite).unwrap(), "\"sqlite\"");
    }

    #[test]
    fn test_contains_predicate_is_case_sensitive_per_dialect() {
        assert_eq!(Dialect::Postgres.contains("nome"), "strpos(nome, ?) > 0");
        assert_eq!(Dialect::MySql.contains("c.nome"), "INSTR(CAST(c.nome AS BINARY), ?) > 0");
        assert_eq!(Dialect::Sqlite.contains("cpf"), "instr(cpf, ?) > 0");
    }

    #[rstest]
    #[case(Dialect::MySql, " FOR UPDATE", " FOR SHARE")]
    #[case(Dialect::Postgres, " FOR UPDATE", " FOR SHARE")]
    #[case(Dialect::Sqlite, "", "")]
    fn test_row_lock_clauses(#[case] dialect: Dialect, #[case] update: &str, #[case] share: &str) {
        assert_eq!(dialect.for_update(), update);
        assert_eq!(dialect.for_share(), share);
    }
}
