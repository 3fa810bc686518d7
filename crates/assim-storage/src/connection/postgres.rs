use super::{Backend, ConnectionTarget, DatabaseConfig, Dialect, connect_pool, replace_scheme};
use crate::cursor::{Cursor, Record, Scope, SqlParam, SqlValue, bind_params};
use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgConnectOptions, PgPool, PgRow, PgSslMode, Postgres};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::str::FromStr;

/// PostgreSQL store, typically cloud hosted. Transport is always encrypted.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    fn connect_options(target: &ConnectionTarget) -> StorageResult<PgConnectOptions> {
        let ConnectionTarget::Url(url) = target else {
            return Err(StorageError::Configuration(
                "PostgreSQL requires a postgres:// URL".to_string(),
            ));
        };

        let url = replace_scheme(url, "postgres")?;
        let options = PgConnectOptions::from_str(&url)
            .map_err(|e| StorageError::Configuration(format!("Invalid database URL: {}", e)))?
            .ssl_mode(PgSslMode::Require);

        Ok(options)
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Backend for PostgresBackend {
    type Cursor = PostgresCursor;

    async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let options = Self::connect_options(&config.target)?;
        let pool = connect_pool::<Postgres>(config, options).await?;
        Ok(Self { pool })
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn cursor(&self) -> StorageResult<PostgresCursor> {
        Ok(PostgresCursor {
            scope: Scope::Pooled(self.pool.acquire().await?),
        })
    }

    async fn begin(&self) -> StorageResult<PostgresCursor> {
        Ok(PostgresCursor {
            scope: Scope::Transaction(self.pool.begin().await?),
        })
    }

    async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations/postgres")
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

pub struct PostgresCursor {
    scope: Scope<Postgres>,
}

impl Cursor for PostgresCursor {
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Vec<Record>> {
        let sql = rewrite_placeholders(sql);
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(self.scope.connection())
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<Record>> {
        let sql = rewrite_placeholders(sql);
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(self.scope.connection())
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<u64> {
        let sql = rewrite_placeholders(sql);
        let result = bind_params(sqlx::query(&sql), params)
            .execute(self.scope.connection())
            .await?;
        Ok(result.rows_affected())
    }

    /// PostgreSQL has no last-insert-id; the id comes back through `RETURNING`.
    async fn insert(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<i64>> {
        let sql = with_returning_id(&rewrite_placeholders(sql));
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(self.scope.connection())
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>("id")?),
            None => Ok(None),
        }
    }

    async fn commit(self) -> StorageResult<()> {
        self.scope.commit().await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.scope.rollback().await
    }
}

/// Turn `?` placeholders into `$1, $2, ...`, leaving quoted text alone.
pub(crate) fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            (None, '?') => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }

    out
}

fn with_returning_id(sql: &str) -> String {
    format!("{} RETURNING id", sql.trim_end().trim_end_matches(';'))
}

fn decode_row(row: &PgRow) -> StorageResult<Record> {
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
                "BOOL" => SqlValue::Bool(row.try_get::<bool, _>(index)?),
                "INT2" => SqlValue::Int(row.try_get::<i16, _>(index)?.into()),
                "INT4" => SqlValue::Int(row.try_get::<i32, _>(index)?.into()),
                "INT8" => SqlValue::Int(row.try_get::<i64, _>(index)?),
                "FLOAT4" => SqlValue::Float(row.try_get::<f32, _>(index)?.into()),
                "FLOAT8" => SqlValue::Float(row.try_get::<f64, _>(index)?),
                "NUMERIC" => {
                    let decimal = row.try_get::<Decimal, _>(index)?;
                    SqlValue::Float(decimal.to_f64().ok_or_else(|| StorageError::Decode {
                        column: column.name().to_string(),
                        message: format!("{decimal} does not fit a float"),
                    })?)
                }
                "DATE" => SqlValue::Date(row.try_get::<NaiveDate, _>(index)?),
                "TIMESTAMP" => SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?),
                "TIMESTAMPTZ" => {
                    SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?.naive_utc())
                }
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
            }
        };

        record.insert(column.name(), value);
    }

    Ok(record)
}
